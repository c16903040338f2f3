// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Approval hook consulted for source kinds that require sign-off.

use async_trait::async_trait;

use crate::types::IngestSource;

/// Everything an approver sees about pending content.
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    pub tag: String,
    pub content: String,
    pub source: IngestSource,
    pub content_hash: String,
    pub token_count: usize,
}

/// Decides whether content needing approval may be admitted.
///
/// Interactive prompts, review queues and policy engines all fit behind
/// this trait. Without a hook, content needing approval is rejected.
#[async_trait]
pub trait ApprovalHook: Send + Sync {
    async fn approve(&self, request: &ApprovalRequest) -> bool;
}

/// Hook that always answers the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedApproval(pub bool);

#[async_trait]
impl ApprovalHook for FixedApproval {
    async fn approve(&self, _request: &ApprovalRequest) -> bool {
        self.0
    }
}
