// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `MemoryPipeline` facade.
//!
//! Each public method is one log-and-degrade boundary: internal errors are
//! logged here and turned into an empty or no-op result.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mneme_admission::{
    AdmissionDecision, AdmissionGuard, ApprovalHook, ContentArchive, IngestSource,
};
use mneme_config::{ConfigError, MnemeConfig};
use mneme_core::types::Collection;
use mneme_core::{Classifier, Clock, EmbeddingProvider, MnemeError, SystemClock, VectorStore};
use mneme_memory::{
    ConversationSession, KeywordClassifier, PersonaEntry, PersonaSeeder, PoolCommitter,
    PoolOutcome, RecordOutcome, RetrievalScorer, RetrievalStats, SeedMode, SeedReport, TurnPair,
    TurnRecorder,
};
use mneme_storage::{Database, SqliteVectorStore};
use tracing::{info, warn};

/// Result of [`MemoryPipeline::begin_turn`].
#[derive(Debug, Clone)]
pub struct TurnContext {
    /// Context lines to place in the prompt. Empty when nothing qualified.
    pub context: String,
    pub stats: RetrievalStats,
    pub user: RecordOutcome,
}

/// Result of [`MemoryPipeline::finish_turn`].
#[derive(Debug, Clone)]
pub struct TurnSummary {
    pub assistant: RecordOutcome,
    pub pooling: PoolOutcome,
}

/// Counts removed by [`MemoryPipeline::purge_expired`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub archive_entries: usize,
    pub episodic_records: usize,
}

/// Memory retrieval and admission over one database.
pub struct MemoryPipeline {
    config: MnemeConfig,
    db: Database,
    store: Arc<dyn VectorStore>,
    clock: Arc<dyn Clock>,
    scorer: RetrievalScorer,
    recorder: TurnRecorder,
    pooler: PoolCommitter,
    seeder: PersonaSeeder,
    guard: AdmissionGuard,
}

impl MemoryPipeline {
    /// Open the configured database and wire the default collaborators.
    pub async fn open(
        config: MnemeConfig,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, MnemeError> {
        mneme_core::metrics::register_metrics();
        let db = Database::open(&config.storage).await?;
        let store: Arc<dyn VectorStore> = Arc::new(SqliteVectorStore::new(db.clone()));
        info!(
            database = %config.storage.database_path,
            dimensions = embedder.dimensions(),
            "memory pipeline ready"
        );
        Ok(Self::from_parts(
            config,
            db,
            store,
            embedder,
            Arc::new(SystemClock),
            Arc::new(KeywordClassifier::default()),
        ))
    }

    /// Open with configuration from the file hierarchy and environment.
    ///
    /// Invalid configuration is rendered, then the pipeline opens with
    /// defaults and restrictive guardrails.
    pub async fn load(embedder: Arc<dyn EmbeddingProvider>) -> Result<Self, MnemeError> {
        let loaded = mneme_config::load_and_validate();
        Self::open(config_or_fail_closed(loaded), embedder).await
    }

    /// Assemble a pipeline from already constructed collaborators.
    pub fn from_parts(
        config: MnemeConfig,
        db: Database,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        clock: Arc<dyn Clock>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        let scorer = RetrievalScorer::new(
            store.clone(),
            embedder.clone(),
            clock.clone(),
            config.retrieval.clone(),
        );
        let recorder = TurnRecorder::new(
            store.clone(),
            embedder.clone(),
            clock.clone(),
            config.recorder.clone(),
        );
        let pooler = PoolCommitter::new(
            store.clone(),
            embedder.clone(),
            classifier,
            clock.clone(),
            config.pooling.clone(),
        );
        let seeder = PersonaSeeder::new(store.clone(), embedder.clone(), clock.clone());
        let guard = AdmissionGuard::new(
            config.guardrails.clone(),
            ContentArchive::new(db.clone()),
            store.clone(),
            embedder,
            clock.clone(),
        );

        Self {
            config,
            db,
            store,
            clock,
            scorer,
            recorder,
            pooler,
            seeder,
            guard,
        }
    }

    /// Install the hook consulted when a source kind requires approval.
    pub fn with_approval_hook(mut self, hook: Arc<dyn ApprovalHook>) -> Self {
        self.guard = self.guard.with_approval_hook(hook);
        self
    }

    pub fn config(&self) -> &MnemeConfig {
        &self.config
    }

    /// Ranked `[PERSONA]`/`[EPISODIC]` context lines for `query`.
    pub async fn retrieve_context(
        &self,
        query: &str,
        topk_persona: usize,
        topk_episodic: usize,
        importance_threshold: f64,
    ) -> (String, RetrievalStats) {
        self.scorer
            .retrieve_context(query, topk_persona, topk_episodic, importance_threshold)
            .await
    }

    pub async fn record_user_turn(&self, text: &str) -> RecordOutcome {
        self.recorder.record_user_turn(text).await
    }

    pub async fn record_assistant_turn(&self, text: &str) -> RecordOutcome {
        self.recorder.record_assistant_turn(text).await
    }

    /// A fresh session with an empty pooling buffer.
    pub fn new_session(&self) -> ConversationSession {
        self.pooler.new_session()
    }

    pub async fn accumulate_and_maybe_commit(
        &self,
        session: &mut ConversationSession,
        pair: TurnPair,
    ) -> PoolOutcome {
        self.pooler.accumulate_and_maybe_commit(session, pair).await
    }

    pub async fn evaluate_admission(
        &self,
        tag: &str,
        content: &str,
        source: IngestSource,
    ) -> AdmissionDecision {
        self.guard.evaluate_admission(tag, content, source).await
    }

    /// Record `user_text`, then retrieve context for it with the configured limits.
    ///
    /// The record written for this turn is excluded from its own context.
    pub async fn begin_turn(&self, user_text: &str) -> TurnContext {
        let user = self.recorder.record_user_turn(user_text).await;
        let exclude: Vec<&str> = user.stored_id().into_iter().collect();
        let retrieval = &self.config.retrieval;
        let (context, stats) = self
            .scorer
            .retrieve_context_excluding(
                user_text,
                retrieval.topk_persona,
                retrieval.topk_episodic,
                retrieval.importance_threshold,
                &exclude,
            )
            .await;
        TurnContext {
            context,
            stats,
            user,
        }
    }

    /// Record the assistant reply and feed the pair to the session's pool.
    pub async fn finish_turn(
        &self,
        session: &mut ConversationSession,
        user_text: &str,
        assistant_text: &str,
    ) -> TurnSummary {
        let assistant = self.recorder.record_assistant_turn(assistant_text).await;
        let pooling = self
            .pooler
            .accumulate_and_maybe_commit(session, TurnPair::new(user_text, assistant_text))
            .await;
        TurnSummary { assistant, pooling }
    }

    /// Upsert persona statements. Failures yield an empty report.
    pub async fn seed_persona(&self, entries: &[PersonaEntry], mode: SeedMode) -> SeedReport {
        match self.seeder.seed(entries, mode).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, entries = entries.len(), "persona seeding failed");
                SeedReport::default()
            }
        }
    }

    /// Seed from a JSON array of persona entries.
    pub async fn seed_persona_file(&self, path: &Path, mode: SeedMode) -> SeedReport {
        match read_persona_file(path).await {
            Ok(entries) => self.seed_persona(&entries, mode).await,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "persona file unreadable");
                SeedReport::default()
            }
        }
    }

    /// Delete every record in `collection` whose topic is `topic`.
    ///
    /// With `dry_run` nothing is removed and the matching count is returned.
    pub async fn delete_topic(&self, collection: Collection, topic: &str, dry_run: bool) -> usize {
        match mneme_memory::delete_topic(self.store.as_ref(), collection, topic, dry_run).await {
            Ok(n) => {
                info!(%collection, topic, dry_run, count = n, "topic delete");
                n
            }
            Err(e) => {
                warn!(%collection, topic, error = %e, "topic delete failed");
                0
            }
        }
    }

    /// Remove every record from `collection`. Returns whether it succeeded.
    pub async fn reset_collection(&self, collection: Collection) -> bool {
        match self.store.reset(collection).await {
            Ok(()) => {
                info!(%collection, "collection reset");
                true
            }
            Err(e) => {
                warn!(%collection, error = %e, "collection reset failed");
                false
            }
        }
    }

    /// Drop archive entries and admitted episodic records expired at `now`.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> PurgeReport {
        let archive_entries = self.guard.purge_expired(now).await.unwrap_or_else(|e| {
            warn!(error = %e, "archive purge failed");
            0
        });
        let episodic_records = mneme_memory::purge_expired_records(self.store.as_ref(), now)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "episodic purge failed");
                0
            });
        let report = PurgeReport {
            archive_entries,
            episodic_records,
        };
        info!(
            archive = report.archive_entries,
            episodic = report.episodic_records,
            "expired memory purged"
        );
        report
    }

    /// Purge with the pipeline's own clock.
    pub async fn purge_expired_now(&self) -> PurgeReport {
        self.purge_expired(self.clock.now()).await
    }

    /// Checkpoint the WAL and close the database.
    pub async fn close(self) -> Result<(), MnemeError> {
        self.db.close().await
    }
}

/// The loaded config, or defaults with restrictive guardrails if it failed.
fn config_or_fail_closed(loaded: Result<MnemeConfig, Vec<ConfigError>>) -> MnemeConfig {
    let guardrails = mneme_config::guardrails_or_restrictive(&loaded);
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            mneme_config::render_errors(&errors);
            MnemeConfig {
                guardrails,
                ..MnemeConfig::default()
            }
        }
    }
}

async fn read_persona_file(path: &Path) -> Result<Vec<PersonaEntry>, MnemeError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| MnemeError::Validation(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| MnemeError::Validation(format!("malformed persona file: {e}")))
}
