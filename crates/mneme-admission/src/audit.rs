// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only JSONL audit trail of admission decisions.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use mneme_core::MnemeError;
use serde::{Deserialize, Serialize};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::types::AdmissionDecision;

/// One line of the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub tag: String,
    pub source: String,
    pub status: String,
    pub reason: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl AuditEntry {
    /// Audit line for an admission decision.
    pub fn admission(decision: &AdmissionDecision, token_count: usize) -> Self {
        Self {
            timestamp: decision.decided_at,
            action: "admission".to_string(),
            tag: decision.tag.clone(),
            source: decision.source.kind.as_str().to_string(),
            status: decision.verdict.as_str().to_string(),
            reason: decision.reason.map(|r| r.as_str().to_string()),
            metadata: serde_json::json!({
                "content_hash": decision.content_hash,
                "origin": decision.source.origin,
                "token_count": token_count,
                "record_id": decision.record_id,
            }),
        }
    }
}

/// Appends one JSON object per line to a file.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `entry` as a single line, creating the file and its parent directory.
    pub async fn append(&self, entry: &AuditEntry) -> Result<(), MnemeError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| MnemeError::Audit { source })?;
            }
        }

        let mut line = serde_json::to_string(entry)
            .map_err(|e| MnemeError::Internal(format!("audit entry encoding failed: {e}")))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|source| MnemeError::Audit { source })?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|source| MnemeError::Audit { source })?;
        file.flush()
            .await
            .map_err(|source| MnemeError::Audit { source })?;
        Ok(())
    }

    /// Read every entry back. A missing file yields an empty list.
    pub async fn entries(&self) -> Result<Vec<AuditEntry>, MnemeError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(MnemeError::Audit { source }),
        };
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .map_err(|e| MnemeError::Internal(format!("malformed audit line: {e}")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IngestSource, RejectReason, Verdict};
    use chrono::TimeZone;

    fn decision(verdict: Verdict, reason: Option<RejectReason>) -> AdmissionDecision {
        AdmissionDecision {
            tag: "websearch".to_string(),
            source: IngestSource::web("https://example.org"),
            content_hash: "deadbeef".to_string(),
            verdict,
            reason,
            record_id: None,
            decided_at: Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn appends_one_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("nested/audit.jsonl"));

        log.append(&AuditEntry::admission(
            &decision(Verdict::TagRejected, Some(RejectReason::TagRejected)),
            4,
        ))
        .await
        .unwrap();
        log.append(&AuditEntry::admission(&decision(Verdict::Persisted, None), 4))
            .await
            .unwrap();

        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw.lines().count(), 2);

        let entries = log.entries().await.unwrap();
        assert_eq!(entries[0].status, "tag_rejected");
        assert_eq!(entries[0].reason.as_deref(), Some("tag_rejected"));
        assert_eq!(entries[0].source, "web");
        assert_eq!(entries[1].status, "persisted");
        assert_eq!(entries[1].reason, None);
        assert_eq!(entries[1].metadata["content_hash"], "deadbeef");
        assert_eq!(entries[1].metadata["origin"], "https://example.org");
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("absent.jsonl"));
        assert!(log.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unwritable_path_is_an_audit_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for append.
        let log = AuditLog::new(dir.path());
        let err = log
            .append(&AuditEntry::admission(&decision(Verdict::Persisted, None), 1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "audit");
    }
}
