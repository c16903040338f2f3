// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Mneme memory pipeline.

use thiserror::Error;

/// Boxed error used as the source of external-collaborator failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The primary error type used across Mneme traits and internal operations.
///
/// Public pipeline operations never return this type to their callers; each
/// operation logs it at its own boundary and degrades to an empty or no-op
/// result instead.
#[derive(Debug, Error)]
pub enum MnemeError {
    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Vector store query or write failure.
    #[error("vector store error: {source}")]
    Store { source: BoxError },

    /// Embedding provider failure.
    #[error("embedding error: {message}")]
    Embedding {
        message: String,
        source: Option<BoxError>,
    },

    /// Input rejected before reaching any store (empty text, malformed pair).
    #[error("validation error: {0}")]
    Validation(String),

    /// Admission audit log could not be written.
    #[error("audit log error: {source}")]
    Audit { source: std::io::Error },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MnemeError {
    /// Wrap any error as a vector store failure.
    pub fn store(source: impl Into<BoxError>) -> Self {
        MnemeError::Store {
            source: source.into(),
        }
    }

    /// Build an embedding failure without an underlying source.
    pub fn embedding(message: impl Into<String>) -> Self {
        MnemeError::Embedding {
            message: message.into(),
            source: None,
        }
    }

    /// Short, stable label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            MnemeError::Config(_) => "config",
            MnemeError::Store { .. } => "store",
            MnemeError::Embedding { .. } => "embedding",
            MnemeError::Validation(_) => "validation",
            MnemeError::Audit { .. } => "audit",
            MnemeError::Internal(_) => "internal",
        }
    }
}
