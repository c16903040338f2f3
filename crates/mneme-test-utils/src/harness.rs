// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness wiring a temp SQLite database to the mock collaborators.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use mneme_config::model::{MnemeConfig, StorageConfig};
use mneme_core::types::Collection;
use mneme_core::{MnemeError, VectorStore};
use mneme_storage::{Database, SqliteVectorStore};

use crate::clock::ManualClock;
use crate::flaky_store::{FailOp, FlakyVectorStore};
use crate::mock_embedder::MockEmbedder;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: MnemeConfig,
    start: DateTime<Utc>,
    failures: Vec<(Collection, FailOp)>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: MnemeConfig::default(),
            start: Utc
                .with_ymd_and_hms(2026, 1, 15, 9, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
            failures: Vec::new(),
        }
    }

    /// Start from this configuration. Storage and audit paths are replaced
    /// with paths inside the harness temp directory.
    pub fn with_config(mut self, config: MnemeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }

    /// Arm a failure on the store before anything runs.
    pub fn failing(mut self, collection: Collection, op: FailOp) -> Self {
        self.failures.push((collection, op));
        self
    }

    pub async fn build(self) -> Result<TestHarness, MnemeError> {
        let temp_dir = tempfile::TempDir::new().map_err(MnemeError::store)?;

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: temp_dir.path().join("test.db").display().to_string(),
            wal_mode: true,
        };
        config.guardrails.audit_log_path = temp_dir
            .path()
            .join("admission_audit.jsonl")
            .display()
            .to_string();

        let db = Database::open(&config.storage).await?;
        let sqlite: Arc<dyn VectorStore> = Arc::new(SqliteVectorStore::new(db.clone()));
        let store = Arc::new(FlakyVectorStore::new(sqlite));
        for (collection, op) in self.failures {
            store.fail(collection, op).await;
        }

        Ok(TestHarness {
            config,
            db,
            store,
            embedder: Arc::new(MockEmbedder::new()),
            clock: Arc::new(ManualClock::new(self.start)),
            temp_dir,
        })
    }
}

/// Complete storage stack over a temp directory.
pub struct TestHarness {
    pub config: MnemeConfig,
    pub db: Database,
    pub store: Arc<FlakyVectorStore>,
    pub embedder: Arc<MockEmbedder>,
    pub clock: Arc<ManualClock>,
    temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default configuration.
    pub async fn new() -> Result<Self, MnemeError> {
        Self::builder().build().await
    }

    pub fn temp_path(&self) -> &std::path::Path {
        self.temp_dir.path()
    }

    /// Every document stored in `collection`, in insertion order.
    pub async fn documents(&self, collection: Collection) -> Vec<String> {
        match self.store.get(collection, None, None).await {
            Ok(records) => records.into_iter().map(|r| r.document).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "harness could not list documents");
                Vec::new()
            }
        }
    }
}
