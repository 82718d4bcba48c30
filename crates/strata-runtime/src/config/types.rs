//! Configuration types.
//!
//! All types implement [`Default`] for compile-time fallback values.

use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Store configuration after merging all layers.
///
/// # Example
///
/// ```
/// use strata_runtime::config::StrataConfig;
///
/// let config = StrataConfig::default();
/// assert_eq!(config.dispatch.defer_timeout(), None);
/// assert_eq!(config.saga.default_debounce_ms, 300);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StrataConfig {
    /// Dispatch path settings.
    pub dispatch: DispatchConfig,

    /// Saga settings.
    pub saga: SagaConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

impl StrataConfig {
    /// Parses from TOML. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Malformed TOML or wrongly typed fields.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Serializes to TOML.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Serialize`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merges `other` on top of `self`.
    ///
    /// Fields of `other` that equal their default do not override.
    pub fn merge(&mut self, other: &Self) {
        self.dispatch.merge(&other.dispatch);
        self.saga.merge(&other.saga);
        self.logging.merge(&other.logging);
    }
}

/// Dispatch path configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DispatchConfig {
    /// Upper bound for awaiting deferred pre-dispatch hooks.
    /// `0` waits indefinitely.
    pub defer_timeout_ms: u64,
}

impl DispatchConfig {
    /// The deferral bound, `None` when unbounded.
    #[must_use]
    pub fn defer_timeout(&self) -> Option<Duration> {
        (self.defer_timeout_ms > 0).then(|| Duration::from_millis(self.defer_timeout_ms))
    }

    fn merge(&mut self, other: &Self) {
        if other.defer_timeout_ms != 0 {
            self.defer_timeout_ms = other.defer_timeout_ms;
        }
    }
}

/// Saga configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SagaConfig {
    /// Delay used by a bare `debounce` strategy name.
    pub default_debounce_ms: u64,
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            default_debounce_ms: 300,
        }
    }
}

impl SagaConfig {
    /// Default debounce delay.
    #[must_use]
    pub fn default_debounce(&self) -> Duration {
        Duration::from_millis(self.default_debounce_ms)
    }

    fn merge(&mut self, other: &Self) {
        if other.default_debounce_ms != Self::default().default_debounce_ms {
            self.default_debounce_ms = other.default_debounce_ms;
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
        }
    }
}

impl LoggingConfig {
    fn merge(&mut self, other: &Self) {
        if other.level != Self::default().level {
            self.level = other.level.clone();
        }
    }
}
