// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persona seeding and collection maintenance.

use std::collections::HashSet;
use std::sync::Arc;

use mneme_core::error::MnemeError;
use mneme_core::types::{Collection, MetadataFilter, MetadataValue};
use mneme_core::{Clock, EmbeddingProvider, VectorStore};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::types::{MemoryKind, MemoryRecord, MemorySource};

/// Importance for persona entries that do not set one.
const DEFAULT_PERSONA_IMPORTANCE: f64 = 1.0;

/// One persona statement to seed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PersonaEntry {
    pub text: String,
    /// Category label such as `identity` or `preference`. Becomes part of the id and a tag.
    pub kind: String,
    pub topic: String,
    #[serde(default)]
    pub importance: Option<f64>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PersonaEntry {
    pub fn new(text: impl Into<String>, kind: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: kind.into(),
            topic: topic.into(),
            importance: None,
            tone: None,
            tags: Vec::new(),
        }
    }

    /// `<kind>-<topic>-<first 12 hex of sha256(kind-topic-text)>`.
    pub fn stable_id(&self) -> String {
        let digest = Sha256::digest(format!("{}-{}-{}", self.kind, self.topic, self.text));
        let hash = hex::encode(digest);
        format!("{}-{}-{}", self.kind, self.topic, &hash[..12])
    }
}

/// How a seed interacts with persona records already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedMode {
    /// Upsert the entries and leave everything else alone.
    #[default]
    Merge,
    /// Upsert the entries and deactivate every other persona record.
    Replace,
}

/// Counts from one seeding run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub upserted: usize,
    pub skipped: usize,
    pub deactivated: usize,
}

/// Upserts persona statements with stable ids.
pub struct PersonaSeeder {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    clock: Arc<dyn Clock>,
}

impl PersonaSeeder {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            embedder,
            clock,
        }
    }

    pub async fn seed(
        &self,
        entries: &[PersonaEntry],
        mode: SeedMode,
    ) -> Result<SeedReport, MnemeError> {
        let now = self.clock.now();
        let mut report = SeedReport::default();

        let mut records = Vec::new();
        let mut seen = HashSet::new();
        for entry in entries {
            let text = entry.text.trim();
            if text.is_empty() || entry.kind.trim().is_empty() || entry.topic.trim().is_empty() {
                debug!(kind = %entry.kind, topic = %entry.topic, "blank persona entry skipped");
                report.skipped += 1;
                continue;
            }
            let id = entry.stable_id();
            if !seen.insert(id.clone()) {
                report.skipped += 1;
                continue;
            }
            let mut record = MemoryRecord::new(id, text, MemoryKind::Persona, MemorySource::Persona, now)
                .with_importance(entry.importance.unwrap_or(DEFAULT_PERSONA_IMPORTANCE))
                .with_topic(entry.topic.trim())
                .with_tags(entry.tags.iter().cloned())
                .with_tags([entry.kind.trim()]);
            if let Some(tone) = &entry.tone {
                record.tone = tone.clone();
            }
            records.push(record);
        }

        if !records.is_empty() {
            let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
            let embeddings = self.embedder.encode(&texts).await?;
            if embeddings.len() != records.len() {
                return Err(MnemeError::embedding(format!(
                    "expected {} embeddings, got {}",
                    records.len(),
                    embeddings.len()
                )));
            }
            let stored = records
                .iter()
                .zip(embeddings)
                .map(|(r, e)| r.to_stored(e))
                .collect();
            self.store.upsert(Collection::Persona, stored).await?;
            report.upserted = records.len();
        }

        if mode == SeedMode::Replace {
            let stale: Vec<_> = self
                .store
                .get(Collection::Persona, Some(&MetadataFilter::eq("active", true)), None)
                .await?
                .into_iter()
                .filter(|r| !seen.contains(&r.id))
                .map(|mut r| {
                    r.metadata.insert("active".into(), MetadataValue::Bool(false));
                    r
                })
                .collect();
            report.deactivated = stale.len();
            if !stale.is_empty() {
                self.store.upsert(Collection::Persona, stale).await?;
            }
        }

        info!(
            upserted = report.upserted,
            skipped = report.skipped,
            deactivated = report.deactivated,
            ?mode,
            "persona seeded"
        );
        Ok(report)
    }
}

/// Remove every record whose `topic` equals `topic`. With `dry_run`, only count them.
pub async fn delete_topic(
    store: &dyn VectorStore,
    collection: Collection,
    topic: &str,
    dry_run: bool,
) -> Result<usize, MnemeError> {
    let filter = MetadataFilter::eq("topic", topic);
    if dry_run {
        return Ok(store.get(collection, Some(&filter), None).await?.len());
    }
    let removed = store.delete_where(collection, &filter).await?;
    info!(collection = collection.as_str(), topic, removed, "topic deleted");
    Ok(removed)
}

/// Delete episodic records whose `expires_at` has passed.
pub async fn purge_expired_records(
    store: &dyn VectorStore,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<usize, MnemeError> {
    let expired: Vec<String> = store
        .get(Collection::Episodic, None, None)
        .await?
        .iter()
        .map(MemoryRecord::from_stored)
        .filter(|r| r.is_expired(now))
        .map(|r| r.id)
        .collect();
    if expired.is_empty() {
        return Ok(0);
    }
    store.delete(Collection::Episodic, &expired).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_id_is_deterministic_and_shaped() {
        let e = PersonaEntry::new("I am Ada", "identity", "name");
        let id = e.stable_id();
        assert_eq!(id, e.stable_id());
        assert!(id.starts_with("identity-name-"));
        assert_eq!(id.len(), "identity-name-".len() + 12);
    }

    #[test]
    fn stable_id_changes_with_text() {
        let a = PersonaEntry::new("I am Ada", "identity", "name");
        let b = PersonaEntry::new("I am Grace", "identity", "name");
        assert_ne!(a.stable_id(), b.stable_id());
    }

    #[test]
    fn entries_deserialize_with_optional_fields() {
        let e: PersonaEntry = serde_json::from_str(
            r#"{"text":"likes tea","kind":"preference","topic":"drinks","tags":["food"]}"#,
        )
        .unwrap();
        assert_eq!(e.importance, None);
        assert_eq!(e.tags, vec!["food".to_string()]);
    }
}
