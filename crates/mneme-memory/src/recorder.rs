// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persists live conversation turns into the episodic collection.
//!
//! User turns are deduplicated by exact normalised text among their nearest
//! neighbours. Assistant turns are filtered for length and formatting
//! artifacts such as a lone `[laughs]`.

use std::sync::Arc;

use mneme_config::model::RecorderConfig;
use mneme_core::error::MnemeError;
use mneme_core::types::Collection;
use mneme_core::{Clock, EmbeddingProvider, VectorStore};
use tracing::{debug, info, warn};

use crate::types::{MemoryKind, MemoryRecord, MemorySource, RecordOutcome, record_id};

/// Topic given to recorded turns.
const TURN_TOPIC: &str = "conversation";

/// Trim and lowercase for duplicate comparison.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// True when `text` is one bracketed token and nothing else, e.g. `[laughs]`.
pub fn is_bracketed_artifact(text: &str) -> bool {
    text.strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .is_some_and(|inner| !inner.contains(['[', ']']))
}

/// Stores user and assistant turns with dedup and artifact filtering.
pub struct TurnRecorder {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    clock: Arc<dyn Clock>,
    config: RecorderConfig,
}

impl TurnRecorder {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        clock: Arc<dyn Clock>,
        config: RecorderConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            clock,
            config,
        }
    }

    /// Record a user message unless an identical one is already stored.
    pub async fn record_user_turn(&self, text: &str) -> RecordOutcome {
        let outcome = self.user_turn(text).await;
        mneme_core::metrics::record_turn("user", outcome.as_str());
        outcome
    }

    /// Record an assistant reply unless it is too short or a formatting artifact.
    pub async fn record_assistant_turn(&self, text: &str) -> RecordOutcome {
        let outcome = self.assistant_turn(text).await;
        mneme_core::metrics::record_turn("assistant", outcome.as_str());
        outcome
    }

    async fn user_turn(&self, text: &str) -> RecordOutcome {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            debug!("empty user turn skipped");
            return RecordOutcome::Rejected { reason: "empty" };
        }

        let normalized = normalize(trimmed);
        match self.is_duplicate(&normalized).await {
            Ok(true) => {
                debug!("duplicate user turn skipped");
                return RecordOutcome::Duplicate;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "user turn dedup check failed, storing anyway");
            }
        }

        self.store_turn(trimmed, MemorySource::User, self.config.user_importance)
            .await
    }

    async fn assistant_turn(&self, text: &str) -> RecordOutcome {
        let trimmed = text.trim();
        if trimmed.chars().count() < self.config.min_assistant_chars {
            debug!(chars = trimmed.chars().count(), "short assistant turn skipped");
            return RecordOutcome::Rejected {
                reason: "too_short",
            };
        }
        if is_bracketed_artifact(trimmed) {
            debug!("assistant formatting artifact skipped");
            return RecordOutcome::Rejected {
                reason: "formatting_artifact",
            };
        }

        self.store_turn(
            trimmed,
            MemorySource::Assistant,
            self.config.assistant_importance,
        )
        .await
    }

    /// Exact normalised match among the nearest stored neighbours.
    async fn is_duplicate(&self, normalized: &str) -> Result<bool, MnemeError> {
        let embedding = self.embedder.encode_query(normalized).await?;
        let hits = self
            .store
            .query(
                Collection::Episodic,
                &embedding,
                self.config.dedup_neighbors,
                None,
            )
            .await?;
        Ok(hits.iter().any(|hit| normalize(&hit.document) == normalized))
    }

    async fn store_turn(&self, text: &str, source: MemorySource, importance: f64) -> RecordOutcome {
        let now = self.clock.now();
        let record = MemoryRecord::new(
            record_id(source.as_str(), now),
            text,
            MemoryKind::Episodic,
            source,
            now,
        )
        .with_importance(importance)
        .with_topic(TURN_TOPIC);

        match self.write(&record).await {
            Ok(()) => {
                info!(id = %record.id, source = source.as_str(), "turn stored");
                RecordOutcome::Stored { id: record.id }
            }
            Err(e) => {
                warn!(source = source.as_str(), error = %e, "failed to store turn");
                mneme_core::metrics::record_store_failure(Collection::Episodic.as_str(), "add");
                RecordOutcome::Failed
            }
        }
    }

    async fn write(&self, record: &MemoryRecord) -> Result<(), MnemeError> {
        let embedding = self.embedder.encode_one(&record.text).await?;
        self.store
            .add(Collection::Episodic, vec![record.to_stored(embedding)])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mneme_test_utils::TestHarness;
    use tracing_test::traced_test;

    fn recorder(harness: &TestHarness) -> TurnRecorder {
        TurnRecorder::new(
            harness.store.clone(),
            harness.embedder.clone(),
            harness.clock.clone(),
            RecorderConfig::default(),
        )
    }

    #[tokio::test]
    #[traced_test]
    async fn duplicate_user_turn_is_logged_and_skipped() {
        let harness = TestHarness::new().await.unwrap();
        let recorder = recorder(&harness);
        assert!(recorder.record_user_turn("Where is my umbrella").await.is_stored());
        assert_eq!(
            recorder.record_user_turn("  where is my UMBRELLA ").await,
            RecordOutcome::Duplicate
        );
        assert!(logs_contain("duplicate user turn skipped"));
    }

    #[tokio::test]
    async fn blank_user_turn_is_rejected() {
        let harness = TestHarness::new().await.unwrap();
        assert_eq!(
            recorder(&harness).record_user_turn(" \n ").await,
            RecordOutcome::Rejected { reason: "empty" }
        );
    }

    #[tokio::test]
    async fn stored_user_turn_keeps_original_case() {
        let harness = TestHarness::new().await.unwrap();
        recorder(&harness).record_user_turn("  Call Mum on Sunday ").await;
        assert_eq!(
            harness.documents(Collection::Episodic).await,
            vec!["Call Mum on Sunday".to_string()]
        );
    }

    #[tokio::test]
    async fn embedding_failure_reports_failed() {
        let harness = TestHarness::new().await.unwrap();
        harness.embedder.set_failing(true);
        assert_eq!(
            recorder(&harness)
                .record_assistant_turn("A perfectly reasonable reply.")
                .await,
            RecordOutcome::Failed
        );
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize("  Hello There \n"), "hello there");
    }

    #[test]
    fn bracketed_artifact_detection() {
        assert!(is_bracketed_artifact("[laughs]"));
        assert!(is_bracketed_artifact("[]"));
        assert!(is_bracketed_artifact("[long pause, then sighs]"));
        assert!(!is_bracketed_artifact("[laughs] that is funny"));
        assert!(!is_bracketed_artifact("[a][b]"));
        assert!(!is_bracketed_artifact("[[nested]]"));
        assert!(!is_bracketed_artifact("plain text"));
        assert!(!is_bracketed_artifact("["));
    }
}
