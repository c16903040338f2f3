// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./mneme.toml` > `~/.config/mneme/mneme.toml` > `/etc/mneme/mneme.toml`
//! with environment variable overrides via `MNEME_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::MnemeConfig;

/// Top-level sections that env var names are split on.
const SECTIONS: &[&str] = &[
    "logging",
    "storage",
    "retrieval",
    "recorder",
    "pooling",
    "guardrails",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/mneme/mneme.toml` (system-wide)
/// 3. `~/.config/mneme/mneme.toml` (user XDG config)
/// 4. `./mneme.toml` (local directory)
/// 5. `MNEME_*` environment variables
pub fn load_config() -> Result<MnemeConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<MnemeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MnemeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MnemeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MnemeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Candidate config files, lowest precedence first.
pub fn config_file_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/mneme/mneme.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("mneme").join("mneme.toml"));
    }
    paths.push(PathBuf::from("mneme.toml"));
    paths
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    config_file_paths()
        .into_iter()
        .fold(
            Figment::new().merge(Serialized::defaults(MnemeConfig::default())),
            |figment, path| figment.merge(Toml::file(path)),
        )
        .merge(env_provider())
}

/// Environment provider mapping `MNEME_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `MNEME_RETRIEVAL_MIN_SCORE` is `retrieval.min_score`.
fn env_provider() -> Env {
    Env::prefixed("MNEME_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a prefix-stripped env key onto its lowercase dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("retrieval_min_score"), "retrieval.min_score");
        assert_eq!(map_env_key("guardrails_ttl_days"), "guardrails.ttl_days");
        assert_eq!(map_env_key("storage_database_path"), "storage.database_path");
        assert_eq!(map_env_key("logging_level"), "logging.level");
    }

    #[test]
    fn env_keys_are_lowercased_before_mapping() {
        assert_eq!(map_env_key("POOLING_POOL_SIZE"), "pooling.pool_size");
        assert_eq!(map_env_key("Guardrails_TTL_Days"), "guardrails.ttl_days");
    }

    #[test]
    fn unknown_section_left_untouched() {
        assert_eq!(map_env_key("nothing_here"), "nothing_here");
    }

    #[test]
    fn env_override_reaches_nested_key() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MNEME_RETRIEVAL_MIN_SCORE", "0.4");
            jail.set_env("MNEME_POOLING_POOL_SIZE", "5");
            jail.set_env("MNEME_GUARDRAILS_MAX_TOKENS", "off");
            let config: MnemeConfig = Figment::new()
                .merge(Serialized::defaults(MnemeConfig::default()))
                .merge(env_provider())
                .extract()?;
            assert!((config.retrieval.min_score - 0.4).abs() < f64::EPSILON);
            assert_eq!(config.pooling.pool_size, 5);
            assert_eq!(config.guardrails.max_tokens, None);
            Ok(())
        });
    }
}
