// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admission guardrails for externally sourced content.
//!
//! Content from outside the conversation (web pages, files, API payloads)
//! must pass [`AdmissionGuard::evaluate_admission`] before it becomes an
//! episodic memory. Every evaluation is appended to a JSONL audit trail and
//! admitted content is archived by SHA-256 so it is never ingested twice
//! while its TTL runs.

pub mod approval;
pub mod archive;
pub mod audit;
pub mod guard;
pub mod types;

pub use approval::{ApprovalHook, ApprovalRequest, FixedApproval};
pub use archive::{ArchiveEntry, ContentArchive};
pub use audit::{AuditEntry, AuditLog};
pub use guard::{AdmissionGuard, content_hash, expiry_for, token_count};
pub use types::{AdmissionDecision, IngestSource, RejectReason, SourceKind, Verdict};
