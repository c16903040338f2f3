// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the admission chain over a real SQLite archive and
//! vector store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Duration;
use mneme_admission::{
    AdmissionGuard, ApprovalHook, ApprovalRequest, ContentArchive, FixedApproval, IngestSource,
    RejectReason, SourceKind, Verdict, content_hash,
};
use mneme_config::model::GuardrailConfig;
use mneme_core::types::Collection;
use mneme_core::{Clock, VectorStore};
use mneme_memory::{MemoryKind, MemoryRecord, MemorySource};
use mneme_test_utils::{FailOp, TestHarness};

const ARTICLE: &str = "Jasmine tea is made by layering green tea leaves with fresh jasmine blossoms.";

fn guardrails(tags: &[&str]) -> GuardrailConfig {
    GuardrailConfig {
        allow_tags: tags.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
        approval_required: BTreeMap::new(),
        ..GuardrailConfig::default()
    }
}

fn guard(h: &TestHarness, config: GuardrailConfig) -> AdmissionGuard {
    let config = GuardrailConfig {
        audit_log_path: h.config.guardrails.audit_log_path.clone(),
        ..config
    };
    AdmissionGuard::new(
        config,
        ContentArchive::new(h.db.clone()),
        h.store.clone(),
        h.embedder.clone(),
        h.clock.clone(),
    )
}

fn manual() -> IngestSource {
    IngestSource::new(SourceKind::Manual)
}

async fn episodic(h: &TestHarness) -> Vec<MemoryRecord> {
    h.store
        .get(Collection::Episodic, None, None)
        .await
        .unwrap()
        .iter()
        .map(MemoryRecord::from_stored)
        .collect()
}

/// Counts calls and answers with a fixed verdict.
struct CountingApproval {
    answer: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl ApprovalHook for CountingApproval {
    async fn approve(&self, request: &ApprovalRequest) -> bool {
        assert_eq!(request.content_hash, content_hash(&request.content));
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

#[tokio::test]
async fn tag_outside_allow_list_is_rejected_first() {
    let h = TestHarness::new().await.unwrap();
    let guard = guard(
        &h,
        GuardrailConfig {
            max_tokens: Some(1),
            ..guardrails(&["websearch"])
        },
    );

    let decision = guard.evaluate_admission("personal", ARTICLE, manual()).await;
    assert_eq!(decision.verdict, Verdict::TagRejected);
    assert_eq!(decision.reason, Some(RejectReason::TagRejected));
    assert!(decision.record_id.is_none());
    assert!(episodic(&h).await.is_empty());
}

#[tokio::test]
async fn tag_rejection_wins_over_duplicate_state() {
    let h = TestHarness::new().await.unwrap();
    let guard = guard(&h, guardrails(&["websearch"]));

    assert!(guard.evaluate_admission("websearch", ARTICLE, manual()).await.is_admitted());
    let decision = guard.evaluate_admission("personal", ARTICLE, manual()).await;
    assert_eq!(decision.reason, Some(RejectReason::TagRejected));
}

#[tokio::test]
async fn identical_content_under_another_tag_is_a_duplicate() {
    let h = TestHarness::new().await.unwrap();
    let guard = guard(&h, guardrails(&["websearch", "docs"]));

    let first = guard.evaluate_admission("websearch", ARTICLE, manual()).await;
    assert_eq!(first.verdict, Verdict::Persisted);
    assert_eq!(first.record_id.as_deref(), Some(first.content_hash.as_str()));

    let second = guard.evaluate_admission("docs", ARTICLE, manual()).await;
    assert_eq!(second.verdict, Verdict::DuplicateRejected);
    assert_eq!(second.reason, Some(RejectReason::Duplicate));
    assert_eq!(second.content_hash, first.content_hash);
    assert_eq!(episodic(&h).await.len(), 1);
}

#[tokio::test]
async fn dedup_can_be_disabled() {
    let h = TestHarness::new().await.unwrap();
    let guard = guard(
        &h,
        GuardrailConfig {
            dedup_enabled: false,
            ..guardrails(&["websearch"])
        },
    );

    assert!(guard.evaluate_admission("websearch", ARTICLE, manual()).await.is_admitted());
    assert!(guard.evaluate_admission("websearch", ARTICLE, manual()).await.is_admitted());
    // Same hash, same id: the second admission replaces the first record.
    assert_eq!(episodic(&h).await.len(), 1);
}

#[tokio::test]
async fn expired_archive_entry_no_longer_blocks() {
    let h = TestHarness::new().await.unwrap();
    let guard = guard(
        &h,
        GuardrailConfig {
            ttl_days: 14,
            ..guardrails(&["websearch"])
        },
    );

    assert!(guard.evaluate_admission("websearch", ARTICLE, manual()).await.is_admitted());
    h.clock.advance(Duration::days(15));
    let again = guard.evaluate_admission("websearch", ARTICLE, manual()).await;
    assert_eq!(again.verdict, Verdict::Persisted);
}

#[tokio::test]
async fn oversized_content_is_rejected() {
    let h = TestHarness::new().await.unwrap();
    let guard = guard(
        &h,
        GuardrailConfig {
            max_tokens: Some(5),
            ..guardrails(&["websearch"])
        },
    );

    let decision = guard
        .evaluate_admission("websearch", "one two three four five six", manual())
        .await;
    assert_eq!(decision.verdict, Verdict::SizeRejected);
    assert_eq!(decision.reason, Some(RejectReason::TooLarge));

    let fits = guard
        .evaluate_admission("websearch", "one two three four five", manual())
        .await;
    assert!(fits.is_admitted());
}

#[tokio::test]
async fn no_size_cap_when_max_tokens_unset() {
    let h = TestHarness::new().await.unwrap();
    let guard = guard(
        &h,
        GuardrailConfig {
            max_tokens: None,
            ..guardrails(&["websearch"])
        },
    );
    let long = "word ".repeat(10_000);
    assert!(guard.evaluate_admission("websearch", &long, manual()).await.is_admitted());
}

#[tokio::test]
async fn blank_content_is_rejected() {
    let h = TestHarness::new().await.unwrap();
    let guard = guard(&h, guardrails(&["websearch"]));
    let decision = guard.evaluate_admission("websearch", "  \n ", manual()).await;
    assert_eq!(decision.verdict, Verdict::SizeRejected);
    assert_eq!(decision.reason, Some(RejectReason::EmptyContent));
}

#[tokio::test]
async fn approval_required_without_hook_is_rejected() {
    let h = TestHarness::new().await.unwrap();
    let guard = guard(
        &h,
        GuardrailConfig {
            approval_required: BTreeMap::from([("web".to_string(), true)]),
            ..guardrails(&["websearch"])
        },
    );

    let web = guard
        .evaluate_admission("websearch", ARTICLE, IngestSource::web("https://tea.example"))
        .await;
    assert_eq!(web.verdict, Verdict::ApprovalRejected);
    assert_eq!(web.reason, Some(RejectReason::ApprovalRequired));

    // Other kinds fall back to approval_default (false).
    let file = guard
        .evaluate_admission("websearch", ARTICLE, IngestSource::file("/notes/tea.md"))
        .await;
    assert!(file.is_admitted());
}

#[tokio::test]
async fn approval_hook_decides() {
    let h = TestHarness::new().await.unwrap();
    let config = GuardrailConfig {
        approval_required: BTreeMap::from([("web".to_string(), true)]),
        ..guardrails(&["websearch"])
    };

    let declining = Arc::new(CountingApproval {
        answer: false,
        calls: AtomicUsize::new(0),
    });
    let guard_no = guard(&h, config.clone()).with_approval_hook(declining.clone());
    let rejected = guard_no
        .evaluate_admission("websearch", ARTICLE, IngestSource::web("https://tea.example"))
        .await;
    assert_eq!(rejected.reason, Some(RejectReason::ApprovalRequired));
    assert_eq!(declining.calls.load(Ordering::SeqCst), 1);

    let guard_yes = guard(&h, config).with_approval_hook(Arc::new(FixedApproval(true)));
    let admitted = guard_yes
        .evaluate_admission("websearch", ARTICLE, IngestSource::web("https://tea.example"))
        .await;
    assert_eq!(admitted.verdict, Verdict::Persisted);
}

#[tokio::test]
async fn hook_is_not_consulted_after_an_earlier_rejection() {
    let h = TestHarness::new().await.unwrap();
    let hook = Arc::new(CountingApproval {
        answer: true,
        calls: AtomicUsize::new(0),
    });
    let guard = guard(
        &h,
        GuardrailConfig {
            approval_default: true,
            ..guardrails(&["websearch"])
        },
    )
    .with_approval_hook(hook.clone());

    guard.evaluate_admission("personal", ARTICLE, manual()).await;
    assert_eq!(hook.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn restrictive_guardrails_admit_nothing() {
    let h = TestHarness::new().await.unwrap();
    let guard = guard(&h, GuardrailConfig::restrictive())
        .with_approval_hook(Arc::new(FixedApproval(true)));
    let decision = guard.evaluate_admission("websearch", ARTICLE, manual()).await;
    assert_eq!(decision.verdict, Verdict::TagRejected);
    assert!(episodic(&h).await.is_empty());
}

#[tokio::test]
async fn admitted_content_becomes_an_expiring_episodic_record() {
    let h = TestHarness::new().await.unwrap();
    let guard = guard(
        &h,
        GuardrailConfig {
            ttl_days: 7,
            ingest_importance: 0.4,
            ..guardrails(&["websearch"])
        },
    );

    let decision = guard
        .evaluate_admission("websearch", ARTICLE, IngestSource::web("https://tea.example"))
        .await;
    let records = episodic(&h).await;
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.id, decision.content_hash);
    assert_eq!(record.text, ARTICLE);
    assert_eq!(record.kind, MemoryKind::Episodic);
    assert_eq!(record.source, MemorySource::External);
    assert_eq!(record.topic, "websearch");
    assert!(record.tags.contains("websearch"));
    assert_eq!(record.origin.as_deref(), Some("https://tea.example"));
    assert!((record.importance() - 0.4).abs() < 1e-9);
    assert_eq!(record.expires_at, Some(h.clock.now() + Duration::days(7)));

    let archived = guard
        .archive()
        .get(&decision.content_hash)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(archived.content, ARTICLE);
    assert_eq!(archived.source_kind, "web");
    assert_eq!(archived.expires_at, h.clock.now() + Duration::days(7));
}

#[tokio::test]
async fn store_failure_yields_persist_failed_and_allows_retry() {
    let h = TestHarness::builder()
        .failing(Collection::Episodic, FailOp::Write)
        .build()
        .await
        .unwrap();
    let guard = guard(&h, guardrails(&["websearch"]));

    let failed = guard.evaluate_admission("websearch", ARTICLE, manual()).await;
    assert_eq!(failed.verdict, Verdict::PersistFailed);
    assert_eq!(failed.reason, Some(RejectReason::PersistFailed));
    assert_eq!(guard.archive().count().await.unwrap(), 0);

    h.store.heal().await;
    let retried = guard.evaluate_admission("websearch", ARTICLE, manual()).await;
    assert_eq!(retried.verdict, Verdict::Persisted);
}

/// Guardrails built in code skip validation, so an absurd ttl must fail
/// closed instead of overflowing the expiry arithmetic.
#[tokio::test]
async fn out_of_range_ttl_yields_persist_failed() {
    let h = TestHarness::new().await.unwrap();
    for ttl_days in [200_000_000, 3_000_000, u32::MAX] {
        let guard = guard(
            &h,
            GuardrailConfig {
                ttl_days,
                ..guardrails(&["websearch"])
            },
        );

        let decision = guard.evaluate_admission("websearch", ARTICLE, manual()).await;
        assert_eq!(decision.verdict, Verdict::PersistFailed, "ttl_days = {ttl_days}");
        assert_eq!(guard.archive().count().await.unwrap(), 0);
    }
    assert!(episodic(&h).await.is_empty());
}

#[tokio::test]
async fn century_ttl_is_admitted_and_still_deduplicated() {
    let h = TestHarness::new().await.unwrap();
    let guard = guard(
        &h,
        GuardrailConfig {
            ttl_days: 36_500,
            ..guardrails(&["websearch"])
        },
    );

    let first = guard.evaluate_admission("websearch", ARTICLE, manual()).await;
    assert_eq!(first.verdict, Verdict::Persisted);
    let second = guard.evaluate_admission("websearch", ARTICLE, manual()).await;
    assert_eq!(second.reason, Some(RejectReason::Duplicate));
}

#[tokio::test]
async fn embedding_failure_yields_persist_failed() {
    let h = TestHarness::new().await.unwrap();
    h.embedder.set_failing(true);
    let guard = guard(&h, guardrails(&["websearch"]));

    let decision = guard.evaluate_admission("websearch", ARTICLE, manual()).await;
    assert_eq!(decision.verdict, Verdict::PersistFailed);
    assert!(episodic(&h).await.is_empty());
}

#[tokio::test]
async fn every_evaluation_is_audited() {
    let h = TestHarness::new().await.unwrap();
    let guard = guard(
        &h,
        GuardrailConfig {
            max_tokens: Some(20),
            ..guardrails(&["websearch"])
        },
    );

    guard.evaluate_admission("personal", ARTICLE, manual()).await;
    guard
        .evaluate_admission("websearch", ARTICLE, IngestSource::web("https://tea.example"))
        .await;
    guard.evaluate_admission("websearch", ARTICLE, manual()).await;
    guard
        .evaluate_admission("websearch", &"long ".repeat(21), manual())
        .await;

    let entries = guard.audit_log().entries().await.unwrap();
    let statuses: Vec<_> = entries.iter().map(|e| e.status.as_str()).collect();
    assert_eq!(
        statuses,
        ["tag_rejected", "persisted", "duplicate_rejected", "size_rejected"]
    );
    let reasons: Vec<_> = entries.iter().map(|e| e.reason.as_deref()).collect();
    assert_eq!(
        reasons,
        [Some("tag_rejected"), None, Some("duplicate"), Some("too_large")]
    );
    assert!(entries.iter().all(|e| e.action == "admission"));
    assert_eq!(entries[1].source, "web");
    assert_eq!(entries[1].metadata["origin"], "https://tea.example");
    assert_eq!(entries[1].timestamp, h.clock.now());
}

#[tokio::test]
async fn unwritable_audit_log_still_returns_decision() {
    let h = TestHarness::new().await.unwrap();
    let config = GuardrailConfig {
        audit_log_path: h.temp_path().display().to_string(),
        ..guardrails(&["websearch"])
    };
    let guard = AdmissionGuard::new(
        config,
        ContentArchive::new(h.db.clone()),
        h.store.clone(),
        h.embedder.clone(),
        h.clock.clone(),
    );

    let decision = guard.evaluate_admission("websearch", ARTICLE, manual()).await;
    assert!(decision.is_admitted());
}

#[tokio::test]
async fn concurrent_identical_admissions_admit_once() {
    let h = TestHarness::new().await.unwrap();
    let guard = Arc::new(guard(&h, guardrails(&["websearch"])));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let guard = guard.clone();
        handles.push(tokio::spawn(async move {
            guard.evaluate_admission("websearch", ARTICLE, manual()).await
        }));
    }
    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap().is_admitted() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 1);
    assert_eq!(episodic(&h).await.len(), 1);
}

#[tokio::test]
async fn purge_clears_expired_archive_entries() {
    let h = TestHarness::new().await.unwrap();
    let guard = guard(
        &h,
        GuardrailConfig {
            ttl_days: 1,
            ..guardrails(&["websearch"])
        },
    );

    guard.evaluate_admission("websearch", ARTICLE, manual()).await;
    assert_eq!(guard.purge_expired(h.clock.now()).await.unwrap(), 0);
    h.clock.advance(Duration::days(2));
    assert_eq!(guard.purge_expired(h.clock.now()).await.unwrap(), 1);
    assert_eq!(guard.archive().count().await.unwrap(), 0);
}
