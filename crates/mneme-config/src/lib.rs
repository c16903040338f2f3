// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Mneme memory pipeline.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, `MNEME_*` environment variable overrides, and
//! diagnostic error rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use mneme_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("persona top-k: {}", config.retrieval.topk_persona);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors, render_to_string};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    BoostConfig, GuardrailConfig, LoggingConfig, MnemeConfig, PoolingConfig, RecorderConfig,
    RetrievalConfig, ScoreWeights, SelectionPolicy, StorageConfig,
};

/// Load configuration from the XDG hierarchy and validate it.
///
/// 1. Loads config from TOML files + env vars via Figment
/// 2. On success: runs post-deserialization validation
/// 3. On Figment error: converts to miette diagnostics with typo suggestions
pub fn load_and_validate() -> Result<MnemeConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let toml_sources = collect_toml_sources();
            Err(diagnostic::figment_to_config_errors(err, &toml_sources))
        }
    }
}

/// Load configuration from a specific TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<MnemeConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Guardrails from a load result, failing closed.
///
/// Any load or validation error yields [`GuardrailConfig::restrictive`], so a
/// broken config can never widen what the admission path lets through.
pub fn guardrails_or_restrictive(
    loaded: &Result<MnemeConfig, Vec<ConfigError>>,
) -> GuardrailConfig {
    match loaded {
        Ok(config) => config.guardrails.clone(),
        Err(errors) => {
            tracing::warn!(
                error_count = errors.len(),
                "configuration invalid, applying restrictive guardrails"
            );
            GuardrailConfig::restrictive()
        }
    }
}

/// Read every existing config file as `(name, contents)` for span lookup.
///
/// Names match what figment records as the error source, so relative
/// paths are resolved against the current directory.
fn collect_toml_sources() -> Vec<(String, String)> {
    loader::config_file_paths()
        .into_iter()
        .filter_map(|path| {
            let contents = std::fs::read_to_string(&path).ok()?;
            let name = if path.is_relative() {
                std::env::current_dir()
                    .map(|dir| dir.join(&path))
                    .unwrap_or(path)
            } else {
                path
            };
            Some((name.display().to_string(), contents))
        })
        .collect()
}
