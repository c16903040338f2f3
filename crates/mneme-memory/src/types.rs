// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory domain types for the retrieval and recording pipeline.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use mneme_core::types::{Collection, Metadata, MetadataValue, StoredRecord};
use serde::{Deserialize, Serialize};

/// What a memory record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// Stable identity or fact statement.
    Persona,
    /// A single conversational event or admitted document.
    Episodic,
    /// Several turns consolidated into one record.
    Pooled,
}

impl MemoryKind {
    /// Convert to string for metadata storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::Persona => "persona",
            MemoryKind::Episodic => "episodic",
            MemoryKind::Pooled => "pooled",
        }
    }

    /// Parse from metadata string.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            "persona" => MemoryKind::Persona,
            "pooled" => MemoryKind::Pooled,
            _ => MemoryKind::Episodic,
        }
    }
}

/// Who produced a memory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemorySource {
    User,
    Assistant,
    /// Seeded persona statement.
    Persona,
    /// Content admitted through the guardrails.
    External,
}

impl MemorySource {
    /// Convert to string for metadata storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemorySource::User => "user",
            MemorySource::Assistant => "assistant",
            MemorySource::Persona => "persona",
            MemorySource::External => "external",
        }
    }

    /// Parse from metadata string.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            "user" => MemorySource::User,
            "persona" => MemorySource::Persona,
            "external" => MemorySource::External,
            _ => MemorySource::Assistant,
        }
    }
}

/// A single memory as the pipeline sees it.
///
/// The embedding is owned by the vector store; this type only carries the
/// fields that become metadata. [`MemoryRecord::metadata`] and
/// [`MemoryRecord::from_parts`] are the only conversions between the two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub text: String,
    pub kind: MemoryKind,
    pub topic: String,
    /// Always within [0, 1].
    importance: f64,
    pub tone: String,
    pub tags: BTreeSet<String>,
    pub timestamp: DateTime<Utc>,
    pub active: bool,
    pub source: MemorySource,
    /// Free-form provenance, such as a URL.
    pub origin: Option<String>,
    /// After this instant the record is ignored by retrieval and purged.
    pub expires_at: Option<DateTime<Utc>>,
}

impl MemoryRecord {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        kind: MemoryKind,
        source: MemorySource,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            kind,
            topic: String::new(),
            importance: 0.0,
            tone: "neutral".to_string(),
            tags: BTreeSet::new(),
            timestamp,
            active: true,
            source,
            origin: None,
            expires_at: None,
        }
    }

    pub fn with_importance(mut self, importance: f64) -> Self {
        self.set_importance(importance);
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = tone.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_origin(mut self, origin: Option<String>) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn importance(&self) -> f64 {
        self.importance
    }

    /// Set importance, clamped to [0, 1]. Non-finite input becomes 0.
    pub fn set_importance(&mut self, importance: f64) {
        self.importance = if importance.is_finite() {
            importance.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }

    /// Age in fractional days at `now`. Future timestamps count as age zero.
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        let seconds = (now - self.timestamp).num_milliseconds() as f64 / 1000.0;
        (seconds / 86_400.0).max(0.0)
    }

    /// Flatten the typed fields into store metadata.
    pub fn metadata(&self) -> Metadata {
        let mut meta = Metadata::new();
        meta.insert("kind".into(), self.kind.as_str().into());
        meta.insert("topic".into(), self.topic.clone().into());
        meta.insert("importance".into(), self.importance.into());
        meta.insert("tone".into(), self.tone.clone().into());
        meta.insert(
            "tags".into(),
            MetadataValue::StringList(self.tags.iter().cloned().collect()),
        );
        meta.insert("timestamp".into(), self.timestamp.to_rfc3339().into());
        meta.insert("active".into(), self.active.into());
        meta.insert("source".into(), self.source.as_str().into());
        if let Some(origin) = &self.origin {
            meta.insert("origin".into(), origin.clone().into());
        }
        if let Some(expires_at) = self.expires_at {
            meta.insert("expires_at".into(), expires_at.to_rfc3339().into());
        }
        meta
    }

    /// Pair this record with its embedding for a store write.
    pub fn to_stored(&self, embedding: Vec<f32>) -> StoredRecord {
        StoredRecord {
            id: self.id.clone(),
            document: self.text.clone(),
            embedding,
            metadata: self.metadata(),
        }
    }

    /// Rebuild a record from a store row.
    ///
    /// Missing or malformed fields fall back to defaults: an unreadable
    /// timestamp is treated as the Unix epoch so the record scores as old.
    pub fn from_parts(id: &str, document: &str, meta: &Metadata) -> Self {
        let text_field = |key: &str| meta.get(key).and_then(MetadataValue::as_str);
        let time_field = |key: &str| {
            text_field(key)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc))
        };

        let tags = match meta.get("tags") {
            Some(MetadataValue::StringList(items)) => items.iter().cloned().collect(),
            _ => BTreeSet::new(),
        };

        let mut record = Self {
            id: id.to_string(),
            text: document.to_string(),
            kind: MemoryKind::from_str_value(text_field("kind").unwrap_or_default()),
            topic: text_field("topic").unwrap_or_default().to_string(),
            importance: 0.0,
            tone: text_field("tone").unwrap_or("neutral").to_string(),
            tags,
            timestamp: time_field("timestamp").unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            active: meta
                .get("active")
                .and_then(MetadataValue::as_bool)
                .unwrap_or(true),
            source: MemorySource::from_str_value(text_field("source").unwrap_or_default()),
            origin: text_field("origin").map(String::from),
            expires_at: time_field("expires_at"),
        };
        record.set_importance(
            meta.get("importance")
                .and_then(MetadataValue::as_f64)
                .unwrap_or(0.0),
        );
        record
    }

    pub fn from_stored(stored: &StoredRecord) -> Self {
        Self::from_parts(&stored.id, &stored.document, &stored.metadata)
    }
}

/// A retrieval candidate with its scores. Never persisted.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub record: MemoryRecord,
    pub collection: Collection,
    /// `1 - cosine distance` from the query.
    pub similarity: f64,
    /// Ranking score: fixed 1.0 for persona, clipped composite for episodic.
    pub score: f64,
}

/// Counters describing one retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetrievalStats {
    /// Persona lines in the emitted context.
    pub persona_hits: usize,
    /// Episodic lines in the emitted context.
    pub episodic_hits: usize,
    pub topk_persona: usize,
    pub topk_episodic: usize,
    /// Candidates returned by the persona query.
    pub persona_considered: usize,
    /// Candidates returned by the episodic query.
    pub episodic_considered: usize,
    pub persona_failed: bool,
    pub episodic_failed: bool,
    pub embedding_failed: bool,
}

/// Result of recording one conversational turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Stored { id: String },
    /// An identical normalised text is already stored.
    Duplicate,
    /// Filtered out before any write.
    Rejected { reason: &'static str },
    /// Embedding or store failure; nothing was written.
    Failed,
}

impl RecordOutcome {
    /// Short label for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordOutcome::Stored { .. } => "stored",
            RecordOutcome::Duplicate => "duplicate",
            RecordOutcome::Rejected { .. } => "rejected",
            RecordOutcome::Failed => "failed",
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, RecordOutcome::Stored { .. })
    }

    /// Id of the written record, if any.
    pub fn stored_id(&self) -> Option<&str> {
        match self {
            RecordOutcome::Stored { id } => Some(id),
            _ => None,
        }
    }
}

/// One user message and the assistant reply to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnPair {
    pub user: String,
    pub assistant: String,
}

impl TurnPair {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
        }
    }

    /// A pair is usable only when both sides have non-blank text.
    pub fn is_complete(&self) -> bool {
        !self.user.trim().is_empty() && !self.assistant.trim().is_empty()
    }
}

/// Build a record id: `<role>-<unix_millis>-<8 random hex>`.
pub fn record_id(role: &str, now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{role}-{}-{}", now.timestamp_millis(), &suffix[..8])
}
