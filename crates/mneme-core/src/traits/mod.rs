// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the pipeline's external collaborators.
//!
//! Async collaborators use `#[async_trait]` for dynamic dispatch compatibility;
//! every implementation is expected to be injected once at startup as an
//! `Arc<dyn Trait>` and shared by all callers.

pub mod classifier;
pub mod clock;
pub mod embedding;
pub mod vector_store;

pub use classifier::{Classification, Classifier};
pub use clock::{Clock, SystemClock};
pub use embedding::EmbeddingProvider;
pub use vector_store::VectorStore;
