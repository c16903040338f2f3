// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any installed recorder can collect these.

use metrics::describe_counter;

/// Register all Mneme metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("mneme_retrievals_total", "Context retrievals served");
    describe_counter!(
        "mneme_store_failures_total",
        "Vector store or embedding failures degraded to empty results"
    );
    describe_counter!(
        "mneme_turns_recorded_total",
        "Conversation turns processed by the turn recorder"
    );
    describe_counter!("mneme_pool_commits_total", "Pooled memory commit attempts");
    describe_counter!("mneme_admissions_total", "Admission decisions by verdict");
}

pub fn record_retrieval() {
    metrics::counter!("mneme_retrievals_total").increment(1);
}

pub fn record_store_failure(collection: &str, op: &'static str) {
    metrics::counter!(
        "mneme_store_failures_total",
        "collection" => collection.to_string(),
        "op" => op
    )
    .increment(1);
}

pub fn record_turn(role: &'static str, outcome: &'static str) {
    metrics::counter!("mneme_turns_recorded_total", "role" => role, "outcome" => outcome)
        .increment(1);
}

pub fn record_pool_commit(status: &'static str) {
    metrics::counter!("mneme_pool_commits_total", "status" => status).increment(1);
}

pub fn record_admission(verdict: &'static str) {
    metrics::counter!("mneme_admissions_total", "verdict" => verdict).increment(1);
}
