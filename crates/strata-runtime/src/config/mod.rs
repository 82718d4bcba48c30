//! Store configuration with layered loading.
//!
//! ```text
//! Priority (highest to lowest):
//!
//! ┌─────────────────────────────────────────┐
//! │  1. Environment Variables (STRATA_*)    │  Runtime override
//! ├─────────────────────────────────────────┤
//! │  2. Config file (with_file)             │  Application settings
//! ├─────────────────────────────────────────┤
//! │  3. Default Values (compile-time)       │  Fallback
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `STRATA_DEFER_TIMEOUT_MS` | `dispatch.defer_timeout_ms` |
//! | `STRATA_DEBOUNCE_MS` | `saga.default_debounce_ms` |
//! | `STRATA_LOG` | `logging.level` |
//!
//! # Usage
//!
//! ```no_run
//! use strata_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .with_file("strata.toml")
//!     .load()?;
//! assert!(config.saga.default_debounce_ms > 0);
//! # Ok::<(), strata_runtime::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::{DispatchConfig, LoggingConfig, SagaConfig, StrataConfig};
