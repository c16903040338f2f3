// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared types crossing the vector store trait boundary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One of the two named vector collections.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Stable identity and fact statements.
    Persona,
    /// Timestamped conversational events, pooled turns and admitted content.
    Episodic,
}

impl Collection {
    /// Both collections, persona first.
    pub const ALL: [Collection; 2] = [Collection::Persona, Collection::Episodic];

    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Persona => "persona",
            Collection::Episodic => "episodic",
        }
    }

    /// Bracketed prefix used on context lines.
    pub fn context_tag(&self) -> &'static str {
        match self {
            Collection::Persona => "[PERSONA]",
            Collection::Episodic => "[EPISODIC]",
        }
    }
}

/// A single metadata value attached to a stored record.
///
/// Concrete stores that only accept scalar metadata must encode
/// [`MetadataValue::StringList`] themselves and decode it on the way out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Number(f64),
    Bool(bool),
    StringList(Vec<String>),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            MetadataValue::StringList(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Number(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

impl From<Vec<String>> for MetadataValue {
    fn from(value: Vec<String>) -> Self {
        MetadataValue::StringList(value)
    }
}

/// Metadata map attached to every stored record. Ordered for stable output.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Conjunction of equality conditions over record metadata.
///
/// A string condition against a list-valued key matches when the list
/// contains that string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    conditions: Vec<(String, MetadataValue)>,
}

impl MetadataFilter {
    /// A filter with a single equality condition.
    pub fn eq(key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self {
            conditions: vec![(key.into(), value.into())],
        }
    }

    /// Add another equality condition.
    pub fn and_eq(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.conditions.push((key.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, MetadataValue)] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Returns true if every condition holds for `metadata`.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.conditions.iter().all(|(key, expected)| {
            match (metadata.get(key), expected) {
                (Some(MetadataValue::StringList(items)), MetadataValue::String(wanted)) => {
                    items.iter().any(|item| item == wanted)
                }
                (Some(actual), expected) => actual == expected,
                (None, _) => false,
            }
        })
    }
}

/// A record as held by a vector store: id, document text, embedding, metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    pub document: String,
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
}

/// A nearest-neighbour hit returned from a vector store query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
    /// Cosine distance (`1 - cosine similarity`), lower is closer.
    pub distance: f32,
}

impl QueryHit {
    /// Similarity derived from the cosine distance.
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
