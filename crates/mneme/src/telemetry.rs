// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracing subscriber setup for hosts that have none of their own.

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber at `log_level` for mneme crates and `warn` elsewhere.
///
/// `RUST_LOG` takes precedence when set. Calling this twice is a no-op.
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(log_level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}

fn default_directives(log_level: &str) -> String {
    ["mneme", "mneme_core", "mneme_config", "mneme_storage", "mneme_memory", "mneme_admission"]
        .iter()
        .map(|target| format!("{target}={log_level}"))
        .chain(std::iter::once("warn".to_string()))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_cover_every_crate() {
        let d = default_directives("debug");
        assert!(d.starts_with("mneme=debug,"));
        assert!(d.contains("mneme_admission=debug"));
        assert!(d.ends_with(",warn"));
        assert!(EnvFilter::try_new(&d).is_ok());
    }

    #[test]
    fn init_twice_does_not_panic() {
        init_tracing("info");
        init_tracing("debug");
    }
}
