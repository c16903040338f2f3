// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pluggable tone/tag classification.

use std::collections::BTreeSet;

/// Tone and tags derived from a piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    pub tone: String,
    pub tags: BTreeSet<String>,
}

/// Derives a tone label and a tag set from text.
///
/// Keyword matching and model-backed classifiers both fit behind this trait;
/// retrieval scoring only ever sees the resulting labels.
pub trait Classifier: Send + Sync {
    fn classify(&self, text: &str) -> Classification;
}
