// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admission decision types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Where a piece of external content came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Web,
    File,
    Api,
    Manual,
}

impl SourceKind {
    /// Key used in `guardrails.approval_required`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Web => "web",
            SourceKind::File => "file",
            SourceKind::Api => "api",
            SourceKind::Manual => "manual",
        }
    }
}

/// Source kind plus optional provenance such as a URL or file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSource {
    pub kind: SourceKind,
    pub origin: Option<String>,
}

impl IngestSource {
    pub fn new(kind: SourceKind) -> Self {
        Self { kind, origin: None }
    }

    pub fn web(url: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Web,
            origin: Some(url.into()),
        }
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::File,
            origin: Some(path.into()),
        }
    }
}

/// Terminal state of one admission.
///
/// `RECEIVED -> {TagRejected | DuplicateRejected | SizeRejected |
/// ApprovalRejected | Persisted | PersistFailed}`. No state is revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    TagRejected,
    DuplicateRejected,
    SizeRejected,
    ApprovalRejected,
    /// Approved, archived and ingested.
    Persisted,
    /// Approved but the archive or store write failed.
    PersistFailed,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::TagRejected => "tag_rejected",
            Verdict::DuplicateRejected => "duplicate_rejected",
            Verdict::SizeRejected => "size_rejected",
            Verdict::ApprovalRejected => "approval_rejected",
            Verdict::Persisted => "persisted",
            Verdict::PersistFailed => "persist_failed",
        }
    }

    pub fn is_admitted(&self) -> bool {
        matches!(self, Verdict::Persisted)
    }
}

/// Reason code carried by every non-persisted decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    TagRejected,
    Duplicate,
    TooLarge,
    /// Blank content; nothing to ingest.
    EmptyContent,
    ApprovalRequired,
    PersistFailed,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::TagRejected => "tag_rejected",
            RejectReason::Duplicate => "duplicate",
            RejectReason::TooLarge => "too_large",
            RejectReason::EmptyContent => "empty_content",
            RejectReason::ApprovalRequired => "approval_required",
            RejectReason::PersistFailed => "persist_failed",
        }
    }

    /// The terminal state this reason leads to.
    pub fn verdict(&self) -> Verdict {
        match self {
            RejectReason::TagRejected => Verdict::TagRejected,
            RejectReason::Duplicate => Verdict::DuplicateRejected,
            RejectReason::TooLarge | RejectReason::EmptyContent => Verdict::SizeRejected,
            RejectReason::ApprovalRequired => Verdict::ApprovalRejected,
            RejectReason::PersistFailed => Verdict::PersistFailed,
        }
    }
}

/// Outcome of one admission evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdmissionDecision {
    pub tag: String,
    pub source: IngestSource,
    /// Lowercase hex SHA-256 of the content.
    pub content_hash: String,
    pub verdict: Verdict,
    /// Set for every verdict except `Persisted`.
    pub reason: Option<RejectReason>,
    /// Episodic record id when persisted (equal to `content_hash`).
    pub record_id: Option<String>,
    pub decided_at: DateTime<Utc>,
}

impl AdmissionDecision {
    pub fn is_admitted(&self) -> bool {
        self.verdict.is_admitted()
    }
}
