// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector store wrapper that fails on demand.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use mneme_core::types::{Collection, MetadataFilter, QueryHit, StoredRecord};
use mneme_core::{MnemeError, VectorStore};
use tokio::sync::Mutex;

/// Which calls to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailOp {
    /// `query`, `get`, `get_by_ids` and `count`.
    Read,
    /// `add`, `upsert`, `delete`, `delete_where` and `reset`.
    Write,
}

/// Delegates to an inner store unless a failure is armed for the collection.
pub struct FlakyVectorStore {
    inner: Arc<dyn VectorStore>,
    failures: Mutex<HashSet<(Collection, FailOp)>>,
}

impl FlakyVectorStore {
    pub fn new(inner: Arc<dyn VectorStore>) -> Self {
        Self {
            inner,
            failures: Mutex::new(HashSet::new()),
        }
    }

    pub async fn fail(&self, collection: Collection, op: FailOp) {
        self.failures.lock().await.insert((collection, op));
    }

    pub async fn heal(&self) {
        self.failures.lock().await.clear();
    }

    async fn check(&self, collection: Collection, op: FailOp) -> Result<(), MnemeError> {
        if self.failures.lock().await.contains(&(collection, op)) {
            return Err(MnemeError::store(format!(
                "injected {op:?} failure on {collection}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for FlakyVectorStore {
    async fn add(
        &self,
        collection: Collection,
        records: Vec<StoredRecord>,
    ) -> Result<(), MnemeError> {
        self.check(collection, FailOp::Write).await?;
        self.inner.add(collection, records).await
    }

    async fn upsert(
        &self,
        collection: Collection,
        records: Vec<StoredRecord>,
    ) -> Result<(), MnemeError> {
        self.check(collection, FailOp::Write).await?;
        self.inner.upsert(collection, records).await
    }

    async fn query(
        &self,
        collection: Collection,
        embedding: &[f32],
        n_results: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>, MnemeError> {
        self.check(collection, FailOp::Read).await?;
        self.inner.query(collection, embedding, n_results, filter).await
    }

    async fn get(
        &self,
        collection: Collection,
        filter: Option<&MetadataFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<StoredRecord>, MnemeError> {
        self.check(collection, FailOp::Read).await?;
        self.inner.get(collection, filter, limit).await
    }

    async fn get_by_ids(
        &self,
        collection: Collection,
        ids: &[String],
    ) -> Result<Vec<StoredRecord>, MnemeError> {
        self.check(collection, FailOp::Read).await?;
        self.inner.get_by_ids(collection, ids).await
    }

    async fn delete(&self, collection: Collection, ids: &[String]) -> Result<usize, MnemeError> {
        self.check(collection, FailOp::Write).await?;
        self.inner.delete(collection, ids).await
    }

    async fn delete_where(
        &self,
        collection: Collection,
        filter: &MetadataFilter,
    ) -> Result<usize, MnemeError> {
        self.check(collection, FailOp::Write).await?;
        self.inner.delete_where(collection, filter).await
    }

    async fn count(&self, collection: Collection) -> Result<usize, MnemeError> {
        self.check(collection, FailOp::Read).await?;
        self.inner.count(collection).await
    }

    async fn reset(&self, collection: Collection) -> Result<(), MnemeError> {
        self.check(collection, FailOp::Write).await?;
        self.inner.reset(collection).await
    }
}
