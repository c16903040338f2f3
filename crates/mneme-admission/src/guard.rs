// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The admission predicate chain.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use mneme_config::model::{GuardrailConfig, MAX_TTL_DAYS};
use mneme_core::MnemeError;
use mneme_core::types::Collection;
use mneme_core::{Clock, EmbeddingProvider, VectorStore};
use mneme_memory::{MemoryKind, MemoryRecord, MemorySource};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::approval::{ApprovalHook, ApprovalRequest};
use crate::archive::{ArchiveEntry, ContentArchive};
use crate::audit::{AuditEntry, AuditLog};
use crate::types::{AdmissionDecision, IngestSource, RejectReason, Verdict};

/// Lowercase hex SHA-256 of `content`.
pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Whitespace-separated token count.
pub fn token_count(content: &str) -> usize {
    content.split_whitespace().count()
}

/// Gatekeeper for externally sourced content.
///
/// Checks run in a fixed order and stop at the first rejection:
/// tag allow-list, content dedup, size, then approval. Each guard holds an
/// async mutex across the whole check-then-persist sequence, so two
/// identical admissions through the same guard cannot both pass dedup.
pub struct AdmissionGuard {
    config: GuardrailConfig,
    archive: ContentArchive,
    audit: AuditLog,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    clock: Arc<dyn Clock>,
    approval: Option<Arc<dyn ApprovalHook>>,
    lock: Mutex<()>,
}

impl AdmissionGuard {
    pub fn new(
        config: GuardrailConfig,
        archive: ContentArchive,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let audit = AuditLog::new(&config.audit_log_path);
        Self {
            config,
            archive,
            audit,
            store,
            embedder,
            clock,
            approval: None,
            lock: Mutex::new(()),
        }
    }

    /// Install the hook consulted for source kinds that require approval.
    pub fn with_approval_hook(mut self, hook: Arc<dyn ApprovalHook>) -> Self {
        self.approval = Some(hook);
        self
    }

    pub fn config(&self) -> &GuardrailConfig {
        &self.config
    }

    pub fn archive(&self) -> &ContentArchive {
        &self.archive
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Decide whether `content` may become an episodic memory.
    ///
    /// Never fails: rejections and persistence failures are verdicts, and
    /// an unwritable audit log is only logged.
    pub async fn evaluate_admission(
        &self,
        tag: &str,
        content: &str,
        source: IngestSource,
    ) -> AdmissionDecision {
        let _guard = self.lock.lock().await;

        let now = self.clock.now();
        let hash = content_hash(content);
        let tokens = token_count(content);

        let (reason, record_id) = match self.check(tag, content, &source, &hash, tokens, now).await
        {
            Some(reason) => (Some(reason), None),
            None => match self.persist(tag, content, &source, &hash, now).await {
                Ok(id) => (None, Some(id)),
                Err(e) => {
                    warn!(tag, hash = %hash, error = %e, "admitted content could not be persisted");
                    (Some(RejectReason::PersistFailed), None)
                }
            },
        };

        let decision = AdmissionDecision {
            tag: tag.to_string(),
            source,
            content_hash: hash,
            verdict: reason.map_or(Verdict::Persisted, |r| r.verdict()),
            reason,
            record_id,
            decided_at: now,
        };

        match decision.reason {
            None => info!(
                tag,
                source = decision.source.kind.as_str(),
                hash = %decision.content_hash,
                tokens,
                "content admitted"
            ),
            Some(reason) => debug!(
                tag,
                source = decision.source.kind.as_str(),
                reason = reason.as_str(),
                "content rejected"
            ),
        }

        if let Err(e) = self
            .audit
            .append(&AuditEntry::admission(&decision, tokens))
            .await
        {
            warn!(path = %self.audit.path().display(), error = %e, "audit log append failed");
        }
        mneme_core::metrics::record_admission(decision.verdict.as_str());

        decision
    }

    /// Run the predicate chain, returning the first rejection.
    async fn check(
        &self,
        tag: &str,
        content: &str,
        source: &IngestSource,
        hash: &str,
        tokens: usize,
        now: DateTime<Utc>,
    ) -> Option<RejectReason> {
        if !self.config.allow_tags.contains(tag) {
            return Some(RejectReason::TagRejected);
        }

        if self.config.dedup_enabled {
            match self.archive.contains_unexpired(hash, now).await {
                Ok(true) => return Some(RejectReason::Duplicate),
                Ok(false) => {}
                Err(e) => {
                    warn!(hash, error = %e, "archive lookup failed, refusing admission");
                    mneme_core::metrics::record_store_failure("content_archive", "get");
                    return Some(RejectReason::PersistFailed);
                }
            }
        }

        if tokens == 0 {
            return Some(RejectReason::EmptyContent);
        }
        if let Some(max) = self.config.max_tokens {
            if tokens > max {
                return Some(RejectReason::TooLarge);
            }
        }

        if self.config.requires_approval(source.kind.as_str()) {
            let approved = match &self.approval {
                Some(hook) => {
                    let request = ApprovalRequest {
                        tag: tag.to_string(),
                        content: content.to_string(),
                        source: source.clone(),
                        content_hash: hash.to_string(),
                        token_count: tokens,
                    };
                    hook.approve(&request).await
                }
                None => false,
            };
            if !approved {
                return Some(RejectReason::ApprovalRequired);
            }
        }

        None
    }

    /// Archive the content and ingest it as an episodic record keyed by its hash.
    async fn persist(
        &self,
        tag: &str,
        content: &str,
        source: &IngestSource,
        hash: &str,
        now: DateTime<Utc>,
    ) -> Result<String, MnemeError> {
        let ttl_days = self.config.ttl_days;
        let expires_at = expiry_for(now, ttl_days).ok_or_else(|| {
            MnemeError::Validation(format!("ttl_days {ttl_days} puts expiry out of range"))
        })?;

        self.archive
            .insert(&ArchiveEntry {
                content_hash: hash.to_string(),
                content: content.to_string(),
                tag: tag.to_string(),
                source_kind: source.kind.as_str().to_string(),
                origin: source.origin.clone(),
                created_at: now,
                expires_at,
            })
            .await?;

        let record = MemoryRecord::new(
            hash,
            content.trim(),
            MemoryKind::Episodic,
            MemorySource::External,
            now,
        )
        .with_importance(self.config.ingest_importance)
        .with_topic(tag)
        .with_tags([tag])
        .with_origin(source.origin.clone())
        .with_expiry(expires_at);

        if let Err(e) = self.ingest(&record).await {
            // Leave no archive entry behind, or a retry would be rejected as a duplicate.
            if let Err(cleanup) = self.archive.remove(hash).await {
                warn!(hash, error = %cleanup, "archive entry left behind after failed ingest");
            }
            mneme_core::metrics::record_store_failure(Collection::Episodic.as_str(), "upsert");
            return Err(e);
        }

        Ok(record.id)
    }

    async fn ingest(&self, record: &MemoryRecord) -> Result<(), MnemeError> {
        let embedding = self.embedder.encode_one(&record.text).await?;
        self.store
            .upsert(Collection::Episodic, vec![record.to_stored(embedding)])
            .await
    }

    /// Drop archive entries expired at `now`.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, MnemeError> {
        let _guard = self.lock.lock().await;
        self.archive.purge_expired(now).await
    }
}

/// Expiry instant for content admitted at `now`.
///
/// `None` when `ttl_days` exceeds [`MAX_TTL_DAYS`] or the result falls past
/// year 9999, where the archive's RFC 3339 text ordering no longer holds.
pub fn expiry_for(now: DateTime<Utc>, ttl_days: u32) -> Option<DateTime<Utc>> {
    if ttl_days > MAX_TTL_DAYS {
        return None;
    }
    Duration::try_days(i64::from(ttl_days))
        .and_then(|ttl| now.checked_add_signed(ttl))
        .filter(|at| at.year() <= 9999)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn expiry_adds_whole_days() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            expiry_for(now, 14),
            Some(Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap())
        );
        assert!(expiry_for(now, MAX_TTL_DAYS).is_some());
    }

    #[test]
    fn expiry_out_of_range_is_none() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(expiry_for(now, MAX_TTL_DAYS + 1), None);
        assert_eq!(expiry_for(now, u32::MAX), None);

        let late = Utc.with_ymd_and_hms(9990, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(expiry_for(late, 36_500), None);
    }

    #[test]
    fn content_hash_is_hex_sha256() {
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(content_hash("abc").len(), 64);
        assert_ne!(content_hash("abc"), content_hash("abd"));
    }

    #[test]
    fn token_count_splits_on_any_whitespace() {
        assert_eq!(token_count(""), 0);
        assert_eq!(token_count("   "), 0);
        assert_eq!(token_count("one two\tthree\nfour"), 4);
        assert_eq!(token_count("  padded  words  "), 2);
    }
}
