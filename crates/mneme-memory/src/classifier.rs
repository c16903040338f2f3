// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword-driven tone and tag classification.

use std::collections::BTreeSet;

use mneme_core::{Classification, Classifier};
use regex::Regex;

/// Tone used when no rule matches.
pub const NEUTRAL_TONE: &str = "neutral";

/// One keyword rule. Matching is case-insensitive on whole words.
#[derive(Debug, Clone)]
struct KeywordRule {
    label: String,
    pattern: Regex,
}

impl KeywordRule {
    fn new(label: &str, keywords: &[&str]) -> Result<Self, regex::Error> {
        let alternation = keywords
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        Ok(Self {
            label: label.to_string(),
            pattern: Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))?,
        })
    }
}

/// [`Classifier`] that picks the first matching tone rule and every matching tag rule.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    tones: Vec<KeywordRule>,
    tags: Vec<KeywordRule>,
    base_tags: BTreeSet<String>,
}

impl KeywordClassifier {
    /// An empty classifier: neutral tone, no tags.
    pub fn empty() -> Self {
        Self {
            tones: Vec::new(),
            tags: Vec::new(),
            base_tags: BTreeSet::new(),
        }
    }

    /// Add a tone rule. Earlier rules win.
    pub fn with_tone(mut self, tone: &str, keywords: &[&str]) -> Result<Self, regex::Error> {
        self.tones.push(KeywordRule::new(tone, keywords)?);
        Ok(self)
    }

    /// Add a tag that is applied when any keyword appears.
    pub fn with_tag(mut self, tag: &str, keywords: &[&str]) -> Result<Self, regex::Error> {
        self.tags.push(KeywordRule::new(tag, keywords)?);
        Ok(self)
    }

    /// Add a tag applied to every classification.
    pub fn with_base_tag(mut self, tag: &str) -> Self {
        self.base_tags.insert(tag.to_string());
        self
    }
}

impl Default for KeywordClassifier {
    /// somber, defiant and poetic tones over a small lexicon; every text is tagged `memory`.
    fn default() -> Self {
        let rules: [(&str, &[&str]); 3] = [
            ("somber", &["regret", "sad", "lonely"]),
            ("defiant", &["courage", "fight", "will"]),
            ("poetic", &["beauty", "soul", "stars"]),
        ];
        let tones = rules
            .iter()
            .filter_map(|(tone, words)| KeywordRule::new(tone, words).ok())
            .collect();
        Self {
            tones,
            tags: Vec::new(),
            base_tags: BTreeSet::from(["memory".to_string()]),
        }
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Classification {
        let tone = self
            .tones
            .iter()
            .find(|rule| rule.pattern.is_match(text))
            .map(|rule| rule.label.clone())
            .unwrap_or_else(|| NEUTRAL_TONE.to_string());

        let mut tags = self.base_tags.clone();
        tags.extend(
            self.tags
                .iter()
                .filter(|rule| rule.pattern.is_match(text))
                .map(|rule| rule.label.clone()),
        );

        Classification { tone, tags }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lexicon_tones() {
        let c = KeywordClassifier::default();
        assert_eq!(c.classify("I feel so lonely tonight").tone, "somber");
        assert_eq!(c.classify("We will FIGHT on").tone, "defiant");
        assert_eq!(c.classify("the stars above").tone, "poetic");
        assert_eq!(c.classify("what time is it").tone, NEUTRAL_TONE);
    }

    #[test]
    fn first_matching_tone_wins() {
        let c = KeywordClassifier::default();
        assert_eq!(c.classify("sad stars").tone, "somber");
    }

    #[test]
    fn matches_whole_words_only() {
        let c = KeywordClassifier::default();
        assert_eq!(c.classify("a willow tree").tone, NEUTRAL_TONE);
    }

    #[test]
    fn default_tags_include_memory() {
        let c = KeywordClassifier::default();
        assert!(c.classify("anything").tags.contains("memory"));
    }

    #[test]
    fn custom_tag_rules_apply() {
        let c = KeywordClassifier::empty()
            .with_tag("travel", &["flight", "hotel"])
            .unwrap()
            .with_tag("food", &["tea"])
            .unwrap();
        let result = c.classify("booked a hotel and had tea");
        assert_eq!(
            result.tags.into_iter().collect::<Vec<_>>(),
            vec!["food".to_string(), "travel".to_string()]
        );
        assert_eq!(result.tone, NEUTRAL_TONE);
    }
}
