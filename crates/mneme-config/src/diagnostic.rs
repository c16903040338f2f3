// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Figment reports what went wrong but not where. This module maps each
//! figment error onto a miette diagnostic, locates the offending key in the
//! TOML text when it can, and offers a Jaro-Winkler "did you mean" for
//! misspelled keys.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Suggestions below this Jaro-Winkler score are noise.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// One problem with the loaded configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(mneme::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        /// Keys accepted in the same section, comma separated.
        valid_keys: String,
        #[label("not a recognised key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(mneme::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        /// Dotted path, e.g. `pooling.pool_size`.
        key: String,
        detail: String,
        expected: String,
        #[label("this value")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(mneme::config::missing_key),
        help("add `{key} = <value>` to mneme.toml")
    )]
    MissingKey { key: String },

    /// Parsed fine but out of range or inconsistent.
    #[error("validation error: {message}")]
    #[diagnostic(code(mneme::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(mneme::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// A span inside a named TOML source, ready to attach to a diagnostic.
type Located = (Option<SourceSpan>, Option<NamedSource<String>>);

/// Turn every error carried by `err` into a diagnostic.
///
/// `toml_sources` holds `(name, contents)` pairs used to attach source spans.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.clone();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let (span, src) = locate(&error, &path, field, toml_sources);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: dotted(&path, field),
                },
                Kind::InvalidType(actual, expected) => {
                    let (span, src) = match path.split_last() {
                        Some((field, section)) => locate(&error, section, field, toml_sources),
                        None => (None, None),
                    };
                    ConfigError::InvalidType {
                        key: path.join("."),
                        detail: format!("found {actual}, expected {expected}"),
                        expected: expected.to_string(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn dotted(section: &[String], field: &str) -> String {
    if section.is_empty() {
        field.to_string()
    } else {
        format!("{}.{field}", section.join("."))
    }
}

/// Point at `field` under `section` in whichever source produced `error`.
fn locate(
    error: &figment::Error,
    section: &[String],
    field: &str,
    toml_sources: &[(String, String)],
) -> Located {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    // Inline strings carry no file name; use the sole source if there is one.
    let source = match file {
        Some(name) => toml_sources.iter().find(|(n, _)| *n == name),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    };

    source
        .and_then(|(name, text)| {
            find_key_offset(text, section, field).map(|offset| {
                (
                    Some(SourceSpan::new(offset.into(), field.len())),
                    Some(NamedSource::new(name, text.clone())),
                )
            })
        })
        .unwrap_or((None, None))
}

/// Byte offset of `key` inside the `[section]` table of `content`.
///
/// An empty `section` means the top level, before the first table header.
/// The search stops at the next table header.
pub fn find_key_offset(content: &str, section: &[String], key: &str) -> Option<usize> {
    let body = if section.is_empty() {
        0
    } else {
        let header = format!("[{}]", section.join("."));
        content.find(&header)? + header.len()
    };

    let mut offset = body;
    for line in content[body..].split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        let rest = &line[indent..];
        if rest.starts_with('[') {
            return None;
        }
        let assigns = rest
            .strip_prefix(key)
            .is_some_and(|after| after.trim_start().starts_with('='));
        if assigns {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

/// Closest valid key by Jaro-Winkler similarity, if any is close enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Render diagnostics with miette's graphical handler.
pub fn render_to_string(errors: &[ConfigError]) -> String {
    let handler = GraphicalReportHandler::new();
    let mut out = String::new();
    for error in errors {
        let mut report = String::new();
        if handler.render_report(&mut report, error as &dyn Diagnostic).is_ok() {
            out.push_str(&report);
        } else {
            out.push_str(&format!("Error: {error}\n"));
        }
    }
    out
}

/// Print diagnostics to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    eprint!("{}", render_to_string(errors));
}
