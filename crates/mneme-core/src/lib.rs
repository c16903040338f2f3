// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Mneme memory pipeline.
//!
//! This crate provides the trait definitions for the pipeline's external
//! collaborators (embedding provider, vector store, classifier, clock), the
//! shared error type, and the metadata types that cross the store boundary.

pub mod error;
pub mod metrics;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{BoxError, MnemeError};
pub use types::{
    Collection, Metadata, MetadataFilter, MetadataValue, QueryHit, StoredRecord,
    cosine_similarity,
};

pub use traits::{
    Classification, Classifier, Clock, EmbeddingProvider, SystemClock, VectorStore,
};
