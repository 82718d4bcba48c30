//! Tracing bootstrap.
//!
//! Filter priority: `RUST_LOG` > `[logging] level` (or `STRATA_LOG`) > `"warn"`.

use crate::config::LoggingConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Resolves the filter directive from `RUST_LOG` (if set) and `config`.
#[must_use]
pub fn directive(config: &LoggingConfig, rust_log: Option<&str>) -> String {
    match rust_log.map(str::trim) {
        Some(env) if !env.is_empty() => env.to_string(),
        _ if !config.level.trim().is_empty() => config.level.trim().to_string(),
        _ => "warn".to_string(),
    }
}

/// Installs a global fmt subscriber.
///
/// Returns `false` if a subscriber was already installed; the existing
/// one is kept. An unparseable directive falls back to `"warn"`.
pub fn init(config: &LoggingConfig) -> bool {
    let rust_log = std::env::var("RUST_LOG").ok();
    let directive = directive(config, rust_log.as_deref());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_filter(filter))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(level: &str) -> LoggingConfig {
        LoggingConfig {
            level: level.to_string(),
        }
    }

    #[test]
    fn rust_log_wins() {
        assert_eq!(directive(&level("info"), Some("strata_runtime=trace")), "strata_runtime=trace");
    }

    #[test]
    fn blank_rust_log_ignored() {
        assert_eq!(directive(&level("debug"), Some("  ")), "debug");
    }

    #[test]
    fn falls_back_to_warn() {
        assert_eq!(directive(&level(""), None), "warn");
    }

    #[test]
    fn init_twice_is_harmless() {
        let _ = init(&level("off"));
        assert!(!init(&level("off")));
    }
}
