// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector store trait over the persona and episodic collections.

use async_trait::async_trait;

use crate::error::MnemeError;
use crate::types::{Collection, MetadataFilter, QueryHit, StoredRecord};

/// Nearest-neighbour store holding two named collections.
///
/// Record ids are unique within a collection. Implementations own metadata
/// encoding: callers always see typed [`crate::types::MetadataValue`]s.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Inserts new records. Fails if any id already exists in the collection.
    async fn add(&self, collection: Collection, records: Vec<StoredRecord>)
    -> Result<(), MnemeError>;

    /// Inserts or replaces records by id.
    async fn upsert(
        &self,
        collection: Collection,
        records: Vec<StoredRecord>,
    ) -> Result<(), MnemeError>;

    /// Returns up to `n_results` records closest to `embedding`, nearest first.
    async fn query(
        &self,
        collection: Collection,
        embedding: &[f32],
        n_results: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>, MnemeError>;

    /// Returns records matching `filter` (all records when `None`).
    async fn get(
        &self,
        collection: Collection,
        filter: Option<&MetadataFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<StoredRecord>, MnemeError>;

    /// Returns the records with the given ids. Unknown ids are ignored.
    async fn get_by_ids(
        &self,
        collection: Collection,
        ids: &[String],
    ) -> Result<Vec<StoredRecord>, MnemeError>;

    /// Deletes records by id, returning how many were removed.
    async fn delete(&self, collection: Collection, ids: &[String]) -> Result<usize, MnemeError>;

    /// Deletes every record matching `filter`, returning how many were removed.
    async fn delete_where(
        &self,
        collection: Collection,
        filter: &MetadataFilter,
    ) -> Result<usize, MnemeError>;

    /// Number of records in the collection.
    async fn count(&self, collection: Collection) -> Result<usize, MnemeError>;

    /// Removes every record in the collection.
    async fn reset(&self, collection: Collection) -> Result<(), MnemeError>;
}
