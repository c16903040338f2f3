// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks ranges and relationships serde attributes cannot express. All
//! problems are collected; validation does not stop at the first one.

use crate::diagnostic::ConfigError;
use crate::model::{MAX_TTL_DAYS, MnemeConfig};

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &MnemeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        push(&mut errors, "storage.database_path must not be empty".into());
    }

    let r = &config.retrieval;
    if r.topk_persona < 1 {
        push(&mut errors, "retrieval.topk_persona must be at least 1".into());
    }
    if r.topk_episodic < 1 {
        push(&mut errors, "retrieval.topk_episodic must be at least 1".into());
    }
    if r.overfetch_factor < 1 {
        push(&mut errors, "retrieval.overfetch_factor must be at least 1".into());
    }
    check_unit(&mut errors, "retrieval.importance_threshold", r.importance_threshold);
    check_unit(&mut errors, "retrieval.min_score", r.min_score);

    let w = &r.weights;
    for (name, value) in [
        ("similarity", w.similarity),
        ("recency", w.recency),
        ("importance", w.importance),
    ] {
        if !value.is_finite() || value < 0.0 {
            push(
                &mut errors,
                format!("retrieval.weights.{name} must be a non-negative number, got {value}"),
            );
        }
    }
    if w.similarity + w.recency + w.importance <= 0.0 {
        push(&mut errors, "retrieval.weights must not all be zero".into());
    }

    for (section, boosts) in [("tone", &r.boosts.tone), ("tags", &r.boosts.tags)] {
        for (key, value) in boosts {
            if !value.is_finite() {
                push(
                    &mut errors,
                    format!("retrieval.boosts.{section}.{key} must be finite, got {value}"),
                );
            }
        }
    }

    check_unit(&mut errors, "recorder.user_importance", config.recorder.user_importance);
    check_unit(
        &mut errors,
        "recorder.assistant_importance",
        config.recorder.assistant_importance,
    );
    if config.recorder.dedup_neighbors < 1 {
        push(&mut errors, "recorder.dedup_neighbors must be at least 1".into());
    }

    if config.pooling.pool_size < 1 {
        push(&mut errors, "pooling.pool_size must be at least 1".into());
    }
    check_unit(&mut errors, "pooling.importance", config.pooling.importance);

    let g = &config.guardrails;
    if g.ttl_days < 1 {
        push(&mut errors, "guardrails.ttl_days must be at least 1".into());
    } else if g.ttl_days > MAX_TTL_DAYS {
        push(
            &mut errors,
            format!("guardrails.ttl_days must be at most {MAX_TTL_DAYS}, got {}", g.ttl_days),
        );
    }
    if g.audit_log_path.trim().is_empty() {
        push(&mut errors, "guardrails.audit_log_path must not be empty".into());
    }
    check_unit(&mut errors, "guardrails.ingest_importance", g.ingest_importance);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn push(errors: &mut Vec<ConfigError>, message: String) {
    errors.push(ConfigError::Validation { message });
}

fn check_unit(errors: &mut Vec<ConfigError>, key: &str, value: f64) {
    if !(0.0..=1.0).contains(&value) {
        push(errors, format!("{key} must be within [0, 1], got {value}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(errors: &[ConfigError]) -> Vec<String> {
        errors.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&MnemeConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = MnemeConfig::default();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(
            errors.iter().any(
                |e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))
            )
        );
    }

    #[test]
    fn out_of_range_thresholds_fail_validation() {
        let mut config = MnemeConfig::default();
        config.retrieval.min_score = 1.5;
        config.retrieval.importance_threshold = -0.1;
        let msgs = messages(&validate_config(&config).unwrap_err());
        assert!(msgs.iter().any(|m| m.contains("retrieval.min_score")));
        assert!(msgs.iter().any(|m| m.contains("retrieval.importance_threshold")));
    }

    #[test]
    fn all_zero_weights_fail_validation() {
        let mut config = MnemeConfig::default();
        config.retrieval.weights.similarity = 0.0;
        config.retrieval.weights.recency = 0.0;
        config.retrieval.weights.importance = 0.0;
        let msgs = messages(&validate_config(&config).unwrap_err());
        assert!(msgs.iter().any(|m| m.contains("must not all be zero")));
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let mut config = MnemeConfig::default();
        config.pooling.pool_size = 0;
        config.guardrails.ttl_days = 0;
        config.retrieval.topk_persona = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn ttl_days_is_bounded_above() {
        let mut config = MnemeConfig::default();
        config.guardrails.ttl_days = MAX_TTL_DAYS;
        assert!(validate_config(&config).is_ok());

        config.guardrails.ttl_days = 200_000_000;
        let msgs = messages(&validate_config(&config).unwrap_err());
        assert!(msgs.iter().any(|m| m.contains("ttl_days must be at most")));
    }

    #[test]
    fn non_finite_boost_fails_validation() {
        let mut config = MnemeConfig::default();
        config.retrieval.boosts.tone.insert("somber".into(), f64::NAN);
        let msgs = messages(&validate_config(&config).unwrap_err());
        assert!(msgs.iter().any(|m| m.contains("boosts.tone.somber")));
    }
}
