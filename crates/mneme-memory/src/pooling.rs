// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Consolidates consecutive turns into pooled episodic records.
//!
//! The pending pairs live in a [`ConversationSession`] owned by the caller.
//! Once the buffer reaches `pool_size` it is drained before the write, so a
//! failing store can never make it grow.

use std::sync::Arc;

use mneme_config::model::PoolingConfig;
use mneme_core::error::MnemeError;
use mneme_core::types::Collection;
use mneme_core::{Classifier, Clock, EmbeddingProvider, VectorStore};
use tracing::{debug, info, warn};

use crate::types::{MemoryKind, MemoryRecord, MemorySource, TurnPair, record_id};

/// Tag carried by every pooled record.
pub const POOLED_TAG: &str = "pooled";

/// Bounded, ordered buffer of pending turn pairs.
#[derive(Debug, Clone)]
pub struct PoolingBuffer {
    pairs: Vec<TurnPair>,
    capacity: usize,
}

impl PoolingBuffer {
    /// A buffer that fills after `capacity` pairs (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            pairs: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a pair. Returns the drained batch once the buffer is full.
    pub fn push(&mut self, pair: TurnPair) -> Option<Vec<TurnPair>> {
        self.pairs.push(pair);
        if self.pairs.len() >= self.capacity {
            Some(std::mem::take(&mut self.pairs))
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn pending(&self) -> &[TurnPair] {
        &self.pairs
    }
}

/// Per-conversation state. Create one per conversation and pass it by `&mut`.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    id: String,
    buffer: PoolingBuffer,
}

impl ConversationSession {
    pub fn new(pool_size: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            buffer: PoolingBuffer::new(pool_size),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn buffer(&self) -> &PoolingBuffer {
        &self.buffer
    }

    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

/// What happened to a pair handed to the pooling path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolOutcome {
    /// Added to the buffer; no commit yet.
    Buffered { pending: usize },
    /// The buffer filled and one pooled record was written.
    Committed { id: String },
    /// The buffer filled but the write failed. The batch is dropped.
    CommitFailed,
    /// The pair was not buffered.
    Skipped { reason: &'static str },
}

impl PoolOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolOutcome::Buffered { .. } => "buffered",
            PoolOutcome::Committed { .. } => "committed",
            PoolOutcome::CommitFailed => "failed",
            PoolOutcome::Skipped { .. } => "skipped",
        }
    }
}

/// Render pairs as `User: ...\nAssistant: ...` blocks joined by newlines.
pub fn pooled_text(pairs: &[TurnPair]) -> String {
    pairs
        .iter()
        .map(|p| format!("User: {}\nAssistant: {}", p.user.trim(), p.assistant.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes pooled records for full session buffers.
pub struct PoolCommitter {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    classifier: Arc<dyn Classifier>,
    clock: Arc<dyn Clock>,
    config: PoolingConfig,
}

impl PoolCommitter {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        classifier: Arc<dyn Classifier>,
        clock: Arc<dyn Clock>,
        config: PoolingConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            classifier,
            clock,
            config,
        }
    }

    /// A fresh session sized to the configured pool.
    pub fn new_session(&self) -> ConversationSession {
        ConversationSession::new(self.config.pool_size)
    }

    /// Buffer `pair` and commit a pooled record if the buffer is now full.
    pub async fn accumulate_and_maybe_commit(
        &self,
        session: &mut ConversationSession,
        pair: TurnPair,
    ) -> PoolOutcome {
        if !self.config.enabled {
            return PoolOutcome::Skipped { reason: "disabled" };
        }
        if !pair.is_complete() {
            debug!(session = %session.id, "incomplete turn pair not pooled");
            return PoolOutcome::Skipped {
                reason: "incomplete_pair",
            };
        }

        let Some(batch) = session.buffer.push(pair) else {
            return PoolOutcome::Buffered {
                pending: session.buffer.len(),
            };
        };

        let outcome = match self.commit(&batch).await {
            Ok(id) => {
                info!(session = %session.id, id = %id, pairs = batch.len(), "pooled memory committed");
                PoolOutcome::Committed { id }
            }
            Err(e) => {
                warn!(session = %session.id, error = %e, "pooled memory commit failed, batch dropped");
                mneme_core::metrics::record_store_failure(Collection::Episodic.as_str(), "add");
                PoolOutcome::CommitFailed
            }
        };
        mneme_core::metrics::record_pool_commit(outcome.as_str());
        outcome
    }

    async fn commit(&self, batch: &[TurnPair]) -> Result<String, MnemeError> {
        let text = pooled_text(batch);
        let classification = self.classifier.classify(&text);
        let now = self.clock.now();

        let record = MemoryRecord::new(
            record_id(POOLED_TAG, now),
            text,
            MemoryKind::Pooled,
            MemorySource::Assistant,
            now,
        )
        .with_importance(self.config.importance)
        .with_topic("conversation")
        .with_tone(classification.tone)
        .with_tags(classification.tags)
        .with_tags([POOLED_TAG]);

        let embedding = self.embedder.encode_one(&record.text).await?;
        self.store
            .add(Collection::Episodic, vec![record.to_stored(embedding)])
            .await?;
        Ok(record.id)
    }
}
