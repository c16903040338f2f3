// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Mneme memory pipeline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Top-level Mneme configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MnemeConfig {
    /// Log level and filter settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Context retrieval scoring and selection.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Live turn persistence.
    #[serde(default)]
    pub recorder: RecorderConfig,

    /// Turn pooling into consolidated records.
    #[serde(default)]
    pub pooling: PoolingConfig,

    /// Admission policy for externally sourced content.
    #[serde(default)]
    pub guardrails: GuardrailConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default level for the `mneme` targets. `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    data_file("mneme.db")
}

fn default_wal_mode() -> bool {
    true
}

fn data_file(name: &str) -> String {
    dirs::data_dir()
        .map(|p| p.join("mneme").join(name))
        .unwrap_or_else(|| std::path::PathBuf::from(name))
        .to_string_lossy()
        .into_owned()
}

/// How episodic candidates are admitted into the context.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Keep a candidate if its composite score or its importance clears the bar.
    #[default]
    ScoreOrImportance,
    /// Keep a candidate only if its composite score clears the bar.
    ScoreOnly,
}

/// Retrieval scoring configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    #[serde(default = "default_topk_persona")]
    pub topk_persona: usize,

    #[serde(default = "default_topk_episodic")]
    pub topk_episodic: usize,

    /// Importance at or above which an episodic candidate is kept regardless of score.
    #[serde(default = "default_importance_threshold")]
    pub importance_threshold: f64,

    /// Composite score at or above which an episodic candidate is kept.
    #[serde(default = "default_min_score")]
    pub min_score: f64,

    /// Episodic candidates fetched per requested slot before filtering.
    #[serde(default = "default_overfetch_factor")]
    pub overfetch_factor: usize,

    #[serde(default)]
    pub selection_policy: SelectionPolicy,

    #[serde(default)]
    pub weights: ScoreWeights,

    #[serde(default)]
    pub boosts: BoostConfig,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            topk_persona: default_topk_persona(),
            topk_episodic: default_topk_episodic(),
            importance_threshold: default_importance_threshold(),
            min_score: default_min_score(),
            overfetch_factor: default_overfetch_factor(),
            selection_policy: SelectionPolicy::default(),
            weights: ScoreWeights::default(),
            boosts: BoostConfig::default(),
        }
    }
}

fn default_topk_persona() -> usize {
    3
}

fn default_topk_episodic() -> usize {
    6
}

fn default_importance_threshold() -> f64 {
    0.6
}

fn default_min_score() -> f64 {
    0.7
}

fn default_overfetch_factor() -> usize {
    2
}

/// Composite score weights for episodic candidates.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScoreWeights {
    #[serde(default = "default_similarity_weight")]
    pub similarity: f64,

    #[serde(default = "default_recency_weight")]
    pub recency: f64,

    #[serde(default = "default_importance_weight")]
    pub importance: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            similarity: default_similarity_weight(),
            recency: default_recency_weight(),
            importance: default_importance_weight(),
        }
    }
}

fn default_similarity_weight() -> f64 {
    0.5
}

fn default_recency_weight() -> f64 {
    0.25
}

fn default_importance_weight() -> f64 {
    0.25
}

/// Additive score bonuses keyed by tone and by tag.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BoostConfig {
    #[serde(default)]
    pub tone: BTreeMap<String, f64>,

    #[serde(default)]
    pub tags: BTreeMap<String, f64>,
}

/// Turn recorder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecorderConfig {
    #[serde(default = "default_user_importance")]
    pub user_importance: f64,

    #[serde(default = "default_assistant_importance")]
    pub assistant_importance: f64,

    /// Assistant replies shorter than this (after trimming) are not stored.
    #[serde(default = "default_min_assistant_chars")]
    pub min_assistant_chars: usize,

    /// Nearest neighbours inspected for an exact duplicate user turn.
    #[serde(default = "default_dedup_neighbors")]
    pub dedup_neighbors: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            user_importance: default_user_importance(),
            assistant_importance: default_assistant_importance(),
            min_assistant_chars: default_min_assistant_chars(),
            dedup_neighbors: default_dedup_neighbors(),
        }
    }
}

fn default_user_importance() -> f64 {
    0.5
}

fn default_assistant_importance() -> f64 {
    0.7
}

fn default_min_assistant_chars() -> usize {
    10
}

fn default_dedup_neighbors() -> usize {
    3
}

/// Turn pooling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PoolingConfig {
    /// When false, finished turns are never pooled.
    #[serde(default = "default_pooling_enabled")]
    pub enabled: bool,

    /// Number of turn pairs consolidated into one pooled record.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    #[serde(default = "default_pool_importance")]
    pub importance: f64,
}

impl Default for PoolingConfig {
    fn default() -> Self {
        Self {
            enabled: default_pooling_enabled(),
            pool_size: default_pool_size(),
            importance: default_pool_importance(),
        }
    }
}

fn default_pooling_enabled() -> bool {
    true
}

fn default_pool_size() -> usize {
    3
}

fn default_pool_importance() -> f64 {
    0.8
}

/// Upper bound for `guardrails.ttl_days` (about a century).
pub const MAX_TTL_DAYS: u32 = 36_500;

/// Admission guardrails for externally sourced content.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GuardrailConfig {
    /// Tags content may be admitted under. Empty admits nothing.
    #[serde(default)]
    pub allow_tags: BTreeSet<String>,

    #[serde(default = "default_dedup_enabled")]
    pub dedup_enabled: bool,

    /// Whitespace-token cap. `None` disables the size check; in TOML or the
    /// environment write `false` or `"off"` to get it.
    #[serde(default = "default_max_tokens", with = "token_cap")]
    pub max_tokens: Option<usize>,

    /// Whether each source kind needs explicit approval.
    #[serde(default = "default_approval_required")]
    pub approval_required: BTreeMap<String, bool>,

    /// Approval requirement for source kinds absent from `approval_required`.
    #[serde(default)]
    pub approval_default: bool,

    /// Lifetime of admitted content in days, at most [`MAX_TTL_DAYS`].
    #[serde(default = "default_ttl_days")]
    pub ttl_days: u32,

    /// Append-only JSONL audit trail of every admission decision.
    #[serde(default = "default_audit_log_path")]
    pub audit_log_path: String,

    /// Importance given to admitted content.
    #[serde(default = "default_ingest_importance")]
    pub ingest_importance: f64,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            allow_tags: BTreeSet::new(),
            dedup_enabled: default_dedup_enabled(),
            max_tokens: default_max_tokens(),
            approval_required: default_approval_required(),
            approval_default: false,
            ttl_days: default_ttl_days(),
            audit_log_path: default_audit_log_path(),
            ingest_importance: default_ingest_importance(),
        }
    }
}

impl GuardrailConfig {
    /// Guardrails that admit nothing: no allowed tags, zero token budget and
    /// approval required for every source kind.
    pub fn restrictive() -> Self {
        Self {
            allow_tags: BTreeSet::new(),
            dedup_enabled: true,
            max_tokens: Some(0),
            approval_required: BTreeMap::new(),
            approval_default: true,
            ..Self::default()
        }
    }

    /// Whether content from `source_kind` needs approval.
    pub fn requires_approval(&self, source_kind: &str) -> bool {
        self.approval_required
            .get(source_kind)
            .copied()
            .unwrap_or(self.approval_default)
    }
}

fn default_dedup_enabled() -> bool {
    true
}

fn default_max_tokens() -> Option<usize> {
    Some(4000)
}

/// Serde adapter for the optional token cap: a count enables the check,
/// `false` or `"off"` disables it.
mod token_cap {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(max) => serializer.serialize_u64(*max as u64),
            None => serializer.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
        deserializer.deserialize_any(TokenCapVisitor)
    }

    #[derive(Clone, Copy)]
    struct TokenCapVisitor;

    impl<'de> Visitor<'de> for TokenCapVisitor {
        type Value = Option<usize>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a token count, `false` or \"off\"")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            usize::try_from(v)
                .map(Some)
                .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            u64::try_from(v)
                .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
                .and_then(|v| self.visit_u64(v))
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            if v {
                Err(E::invalid_value(de::Unexpected::Bool(v), &self))
            } else {
                Ok(None)
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            match v.trim().to_ascii_lowercase().as_str() {
                "off" | "none" | "false" => Ok(None),
                other => other
                    .parse::<usize>()
                    .map(Some)
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self)),
            }
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
            deserializer.deserialize_any(self)
        }
    }
}

fn default_approval_required() -> BTreeMap<String, bool> {
    BTreeMap::from([("web".to_string(), true)])
}

fn default_ttl_days() -> u32 {
    14
}

fn default_audit_log_path() -> String {
    data_file("admission_audit.jsonl")
}

fn default_ingest_importance() -> f64 {
    0.5
}
