// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding provider trait for text-to-vector encoding.

use async_trait::async_trait;

use crate::error::MnemeError;

/// Converts text into fixed-dimension vectors.
///
/// Document and query encoding are separate paths so asymmetric models
/// (different prefixes or heads for queries) can be plugged in.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Dimension of every vector this provider returns.
    fn dimensions(&self) -> usize;

    /// Encodes documents for storage. Returns one vector per input text.
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MnemeError>;

    /// Encodes a single search query.
    async fn encode_query(&self, text: &str) -> Result<Vec<f32>, MnemeError> {
        self.encode_one(text).await
    }

    /// Encodes a single document.
    async fn encode_one(&self, text: &str) -> Result<Vec<f32>, MnemeError> {
        self.encode(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MnemeError::embedding("embedding returned no results"))
    }
}
