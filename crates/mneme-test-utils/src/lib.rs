// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Mneme integration tests.
//!
//! Provides mock collaborators and a harness for fast, deterministic tests
//! without embedding models or external vector services.
//!
//! # Components
//!
//! - [`MockEmbedder`] - Deterministic hashed bag-of-words embedder
//! - [`FlakyVectorStore`] - Vector store wrapper with per-collection failure injection
//! - [`ManualClock`] - Settable clock
//! - [`TestHarness`] - Temp SQLite database wired to the mocks

pub mod clock;
pub mod flaky_store;
pub mod harness;
pub mod mock_embedder;

pub use clock::ManualClock;
pub use flaky_store::{FailOp, FlakyVectorStore};
pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_embedder::MockEmbedder;
