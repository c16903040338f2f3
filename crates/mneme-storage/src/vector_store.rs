// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed vector store with brute-force cosine search.
//!
//! Embeddings are stored as little-endian f32 BLOBs. Metadata lives in a
//! key/value side table whose columns only hold scalars, so string lists are
//! encoded as JSON array text tagged `list` and decoded on the way out.

use std::collections::HashMap;

use async_trait::async_trait;
use mneme_core::types::{
    Collection, Metadata, MetadataFilter, MetadataValue, QueryHit, StoredRecord,
    cosine_similarity,
};
use mneme_core::{MnemeError, VectorStore};
use rusqlite::types::Type;
use tracing::debug;

use crate::database::{Database, map_tr_err};

/// Serialize an f32 vector to a little-endian byte BLOB.
pub fn vec_to_blob(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize a little-endian byte BLOB back to an f32 vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// [`VectorStore`] over the `vector_records` and `vector_metadata` tables.
#[derive(Clone)]
pub struct SqliteVectorStore {
    db: Database,
}

impl SqliteVectorStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Load every record in a collection, in insertion order.
    async fn load(&self, collection: Collection) -> Result<Vec<StoredRecord>, MnemeError> {
        let name = collection.as_str();
        self.db
            .connection()
            .call(move |conn| load_collection(conn, name))
            .await
            .map_err(map_tr_err)
    }

    async fn load_matching(
        &self,
        collection: Collection,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<StoredRecord>, MnemeError> {
        let mut records = self.load(collection).await?;
        if let Some(filter) = filter {
            records.retain(|r| filter.matches(&r.metadata));
        }
        Ok(records)
    }

    async fn write(
        &self,
        collection: Collection,
        records: Vec<StoredRecord>,
        replace: bool,
    ) -> Result<(), MnemeError> {
        let name = collection.as_str();
        let count = records.len();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                let tx = conn.transaction()?;
                for record in &records {
                    let blob = vec_to_blob(&record.embedding);
                    if replace {
                        tx.execute(
                            "INSERT INTO vector_records (collection, id, document, embedding) \
                             VALUES (?1, ?2, ?3, ?4) \
                             ON CONFLICT(collection, id) DO UPDATE SET \
                             document = excluded.document, embedding = excluded.embedding",
                            rusqlite::params![name, record.id, record.document, blob],
                        )?;
                        tx.execute(
                            "DELETE FROM vector_metadata WHERE collection = ?1 AND record_id = ?2",
                            rusqlite::params![name, record.id],
                        )?;
                    } else {
                        tx.execute(
                            "INSERT INTO vector_records (collection, id, document, embedding) \
                             VALUES (?1, ?2, ?3, ?4)",
                            rusqlite::params![name, record.id, record.document, blob],
                        )?;
                    }
                    for (key, value) in &record.metadata {
                        let (value_type, text, number) = encode_value(value)?;
                        tx.execute(
                            "INSERT INTO vector_metadata \
                             (collection, record_id, key, value_type, value_text, value_number) \
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                            rusqlite::params![name, record.id, key, value_type, text, number],
                        )?;
                    }
                }
                tx.commit()
            })
            .await
            .map_err(map_tr_err)?;
        debug!(collection = name, count, replace, "vector records written");
        Ok(())
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn add(
        &self,
        collection: Collection,
        records: Vec<StoredRecord>,
    ) -> Result<(), MnemeError> {
        self.write(collection, records, false).await
    }

    async fn upsert(
        &self,
        collection: Collection,
        records: Vec<StoredRecord>,
    ) -> Result<(), MnemeError> {
        self.write(collection, records, true).await
    }

    async fn query(
        &self,
        collection: Collection,
        embedding: &[f32],
        n_results: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>, MnemeError> {
        if n_results == 0 {
            return Ok(Vec::new());
        }
        let records = self.load_matching(collection, filter).await?;
        let mut hits: Vec<QueryHit> = records
            .into_iter()
            .map(|r| {
                let distance = 1.0 - cosine_similarity(embedding, &r.embedding);
                QueryHit {
                    id: r.id,
                    document: r.document,
                    metadata: r.metadata,
                    distance,
                }
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(n_results);
        Ok(hits)
    }

    async fn get(
        &self,
        collection: Collection,
        filter: Option<&MetadataFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<StoredRecord>, MnemeError> {
        let mut records = self.load_matching(collection, filter).await?;
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    async fn get_by_ids(
        &self,
        collection: Collection,
        ids: &[String],
    ) -> Result<Vec<StoredRecord>, MnemeError> {
        let mut records = self.load(collection).await?;
        records.retain(|r| ids.contains(&r.id));
        Ok(records)
    }

    async fn delete(&self, collection: Collection, ids: &[String]) -> Result<usize, MnemeError> {
        let name = collection.as_str();
        let ids = ids.to_vec();
        self.db
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                let tx = conn.transaction()?;
                let mut removed = 0;
                for id in &ids {
                    tx.execute(
                        "DELETE FROM vector_metadata WHERE collection = ?1 AND record_id = ?2",
                        rusqlite::params![name, id],
                    )?;
                    removed += tx.execute(
                        "DELETE FROM vector_records WHERE collection = ?1 AND id = ?2",
                        rusqlite::params![name, id],
                    )?;
                }
                tx.commit()?;
                Ok(removed)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn delete_where(
        &self,
        collection: Collection,
        filter: &MetadataFilter,
    ) -> Result<usize, MnemeError> {
        let ids: Vec<String> = self
            .load_matching(collection, Some(filter))
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }
        self.delete(collection, &ids).await
    }

    async fn count(&self, collection: Collection) -> Result<usize, MnemeError> {
        let name = collection.as_str();
        self.db
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                let n: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM vector_records WHERE collection = ?1",
                    rusqlite::params![name],
                    |row| row.get(0),
                )?;
                Ok(usize::try_from(n).unwrap_or(0))
            })
            .await
            .map_err(map_tr_err)
    }

    async fn reset(&self, collection: Collection) -> Result<(), MnemeError> {
        let name = collection.as_str();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "DELETE FROM vector_metadata WHERE collection = ?1",
                    rusqlite::params![name],
                )?;
                tx.execute(
                    "DELETE FROM vector_records WHERE collection = ?1",
                    rusqlite::params![name],
                )?;
                tx.commit()
            })
            .await
            .map_err(map_tr_err)?;
        debug!(collection = name, "collection reset");
        Ok(())
    }
}

fn load_collection(
    conn: &mut rusqlite::Connection,
    collection: &str,
) -> Result<Vec<StoredRecord>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, document, embedding FROM vector_records \
         WHERE collection = ?1 ORDER BY rowid",
    )?;
    let mut records = stmt
        .query_map(rusqlite::params![collection], |row| {
            let blob: Vec<u8> = row.get(2)?;
            Ok(StoredRecord {
                id: row.get(0)?,
                document: row.get(1)?,
                embedding: blob_to_vec(&blob),
                metadata: Metadata::new(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let index: HashMap<String, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id.clone(), i))
        .collect();

    let mut stmt = conn.prepare(
        "SELECT record_id, key, value_type, value_text, value_number \
         FROM vector_metadata WHERE collection = ?1",
    )?;
    let mut rows = stmt.query(rusqlite::params![collection])?;
    while let Some(row) = rows.next()? {
        let record_id: String = row.get(0)?;
        let key: String = row.get(1)?;
        let value_type: String = row.get(2)?;
        let text: Option<String> = row.get(3)?;
        let number: Option<f64> = row.get(4)?;
        let value = decode_value(&value_type, text, number)?;
        if let Some(&i) = index.get(&record_id) {
            records[i].metadata.insert(key, value);
        }
    }

    Ok(records)
}

type EncodedValue = (&'static str, Option<String>, Option<f64>);

fn encode_value(value: &MetadataValue) -> Result<EncodedValue, rusqlite::Error> {
    Ok(match value {
        MetadataValue::String(s) => ("string", Some(s.clone()), None),
        MetadataValue::Number(n) => ("number", None, Some(*n)),
        MetadataValue::Bool(b) => ("bool", None, Some(if *b { 1.0 } else { 0.0 })),
        MetadataValue::StringList(items) => {
            let json = serde_json::to_string(items)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            ("list", Some(json), None)
        }
    })
}

fn decode_value(
    value_type: &str,
    text: Option<String>,
    number: Option<f64>,
) -> Result<MetadataValue, rusqlite::Error> {
    Ok(match value_type {
        "number" => MetadataValue::Number(number.unwrap_or_default()),
        "bool" => MetadataValue::Bool(number.unwrap_or_default() != 0.0),
        "list" => {
            let json = text.unwrap_or_else(|| "[]".to_string());
            let items: Vec<String> = serde_json::from_str(&json)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
            MetadataValue::StringList(items)
        }
        _ => MetadataValue::String(text.unwrap_or_default()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, doc: &str, embedding: Vec<f32>, topic: &str) -> StoredRecord {
        let mut metadata = Metadata::new();
        metadata.insert("topic".into(), topic.into());
        metadata.insert("importance".into(), 0.5.into());
        metadata.insert("active".into(), true.into());
        metadata.insert(
            "tags".into(),
            vec!["alpha".to_string(), "beta, with comma".to_string()].into(),
        );
        StoredRecord {
            id: id.into(),
            document: doc.into(),
            embedding,
            metadata,
        }
    }

    async fn store() -> SqliteVectorStore {
        SqliteVectorStore::new(Database::open_in_memory().await.unwrap())
    }

    #[test]
    fn blob_roundtrip_preserves_values() {
        let v = vec![0.25_f32, -1.5, 3.0];
        assert_eq!(blob_to_vec(&vec_to_blob(&v)), v);
        assert_eq!(vec_to_blob(&v).len(), 12);
    }

    #[tokio::test]
    async fn upsert_then_get_by_id_returns_identical_metadata() {
        let store = store().await;
        let r = record("a", "likes tea", vec![1.0, 0.0], "drinks");
        store
            .upsert(Collection::Persona, vec![r.clone()])
            .await
            .unwrap();

        let fetched = store
            .get_by_ids(Collection::Persona, &["a".to_string()])
            .await
            .unwrap();
        assert_eq!(fetched, vec![r]);
    }

    #[tokio::test]
    async fn upsert_replaces_document_and_metadata() {
        let store = store().await;
        store
            .upsert(
                Collection::Persona,
                vec![record("a", "old", vec![1.0, 0.0], "t")],
            )
            .await
            .unwrap();
        let mut updated = record("a", "new", vec![0.0, 1.0], "t");
        updated.metadata.insert("active".into(), false.into());
        updated.metadata.remove("tags");
        store
            .upsert(Collection::Persona, vec![updated.clone()])
            .await
            .unwrap();

        let all = store.get(Collection::Persona, None, None).await.unwrap();
        assert_eq!(all, vec![updated]);
    }

    #[tokio::test]
    async fn add_rejects_duplicate_ids() {
        let store = store().await;
        let r = record("a", "doc", vec![1.0], "t");
        store.add(Collection::Episodic, vec![r.clone()]).await.unwrap();
        let err = store.add(Collection::Episodic, vec![r]).await.unwrap_err();
        assert_eq!(err.kind(), "store");
        assert_eq!(store.count(Collection::Episodic).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let store = store().await;
        store
            .add(Collection::Persona, vec![record("a", "p", vec![1.0], "t")])
            .await
            .unwrap();
        store
            .add(Collection::Episodic, vec![record("a", "e", vec![1.0], "t")])
            .await
            .unwrap();
        store.reset(Collection::Episodic).await.unwrap();
        assert_eq!(store.count(Collection::Persona).await.unwrap(), 1);
        assert_eq!(store.count(Collection::Episodic).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn query_orders_by_cosine_distance() {
        let store = store().await;
        store
            .add(
                Collection::Episodic,
                vec![
                    record("far", "far", vec![0.0, 1.0], "t"),
                    record("near", "near", vec![1.0, 0.1], "t"),
                    record("exact", "exact", vec![1.0, 0.0], "t"),
                ],
            )
            .await
            .unwrap();

        let hits = store
            .query(Collection::Episodic, &[1.0, 0.0], 2, None)
            .await
            .unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near"]);
        assert!(hits[0].distance.abs() < 1e-6);
        assert!((hits[0].similarity() - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn query_applies_metadata_filter() {
        let store = store().await;
        let mut inactive = record("off", "off", vec![1.0, 0.0], "t");
        inactive.metadata.insert("active".into(), false.into());
        store
            .add(
                Collection::Persona,
                vec![inactive, record("on", "on", vec![0.5, 0.5], "t")],
            )
            .await
            .unwrap();

        let filter = MetadataFilter::eq("active", true);
        let hits = store
            .query(Collection::Persona, &[1.0, 0.0], 5, Some(&filter))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "on");
    }

    #[tokio::test]
    async fn delete_where_removes_matching_topic_only() {
        let store = store().await;
        store
            .add(
                Collection::Episodic,
                vec![
                    record("a", "a", vec![1.0], "food"),
                    record("b", "b", vec![1.0], "food"),
                    record("c", "c", vec![1.0], "travel"),
                ],
            )
            .await
            .unwrap();

        let removed = store
            .delete_where(Collection::Episodic, &MetadataFilter::eq("topic", "food"))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        let left = store.get(Collection::Episodic, None, None).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, "c");
    }

    #[tokio::test]
    async fn delete_ignores_unknown_ids() {
        let store = store().await;
        store
            .add(Collection::Episodic, vec![record("a", "a", vec![1.0], "t")])
            .await
            .unwrap();
        let removed = store
            .delete(Collection::Episodic, &["a".into(), "missing".into()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn get_respects_limit_and_insertion_order() {
        let store = store().await;
        store
            .add(
                Collection::Episodic,
                vec![
                    record("1", "one", vec![1.0], "t"),
                    record("2", "two", vec![1.0], "t"),
                    record("3", "three", vec![1.0], "t"),
                ],
            )
            .await
            .unwrap();
        let got = store
            .get(Collection::Episodic, None, Some(2))
            .await
            .unwrap();
        let ids: Vec<&str> = got.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn list_filter_matches_after_roundtrip() {
        let store = store().await;
        store
            .add(Collection::Episodic, vec![record("a", "a", vec![1.0], "t")])
            .await
            .unwrap();
        let got = store
            .get(
                Collection::Episodic,
                Some(&MetadataFilter::eq("tags", "beta, with comma")),
                None,
            )
            .await
            .unwrap();
        assert_eq!(got.len(), 1);
    }
}
