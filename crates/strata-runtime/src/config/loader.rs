//! Configuration loader with layered merging.
//!
//! # Load Order
//!
//! 1. Default values (compile-time)
//! 2. Config file (`with_file`), if it exists
//! 3. Environment variables (`STRATA_*`)
//!
//! Each layer overrides the previous.

use super::{ConfigError, StrataConfig};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parses an integer environment variable into a config field.
macro_rules! parse_env_u64 {
    ($lookup:expr, $field:expr, $var:literal) => {
        if let Some(val) = $lookup($var) {
            $field = val
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::invalid_env_var($var, "expected unsigned integer"))?;
        }
    };
}

/// Configuration loader with builder pattern.
///
/// # Example
///
/// ```
/// use strata_runtime::config::{ConfigLoader, StrataConfig};
///
/// let config = ConfigLoader::new()
///     .skip_env_vars() // For testing
///     .load()
///     .unwrap();
/// assert_eq!(config, StrataConfig::default());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    /// Config file path.
    file: Option<PathBuf>,

    /// Skip environment variable loading.
    skip_env: bool,
}

impl ConfigLoader {
    /// Creates a new loader with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the config file. A missing file is ignored.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Skips environment variable loading.
    ///
    /// Useful for testing with deterministic config.
    #[must_use]
    pub fn skip_env_vars(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Loads and merges configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// parsed, or an environment variable has an invalid value.
    pub fn load(&self) -> Result<StrataConfig, ConfigError> {
        let mut config = StrataConfig::default();

        if let Some(ref path) = self.file {
            if let Some(file_config) = load_file(path)? {
                debug!(path = %path.display(), "Loaded config file");
                config.merge(&file_config);
            }
        }

        if !self.skip_env {
            apply_env(&mut config, |name| std::env::var(name).ok())?;
        }

        Ok(config)
    }
}

/// Loads a config file, returning None if it doesn't exist.
fn load_file(path: &Path) -> Result<Option<StrataConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    let config = StrataConfig::from_toml(&content).map_err(|e| ConfigError::parse_toml(path, e))?;
    Ok(Some(config))
}

/// Applies environment overrides read through `lookup`.
fn apply_env(
    config: &mut StrataConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    parse_env_u64!(lookup, config.dispatch.defer_timeout_ms, "STRATA_DEFER_TIMEOUT_MS");
    parse_env_u64!(lookup, config.saga.default_debounce_ms, "STRATA_DEBOUNCE_MS");

    if let Some(level) = lookup("STRATA_LOG") {
        config.logging.level = level;
    }
    Ok(())
}
