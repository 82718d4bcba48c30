//! Machine-readable error codes shared by every strata crate.
//!
//! Each error enum in the workspace implements [`ErrorCode`] so callers
//! can branch on a stable string instead of matching on Display output.
//!
//! # Conventions
//!
//! | Crate | Prefix |
//! |-------|--------|
//! | `strata-types` | `TYPES_` |
//! | `strata-hook` | `HOOK_` |
//! | `strata-runtime` (registry) | `REGISTRY_` |
//! | `strata-runtime` (controllers) | `CONTROLLER_` |
//! | `strata-runtime` (sagas) | `SAGA_` |
//! | `strata-runtime` (store) | `STORE_`, `DISPATCH_`, `REDUCER_` |
//!
//! # Example
//!
//! ```
//! use strata_types::ErrorCode;
//!
//! enum LoadError {
//!     Missing,
//!     Busy,
//! }
//!
//! impl ErrorCode for LoadError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::Missing => "LOAD_MISSING",
//!             Self::Busy => "LOAD_BUSY",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Busy)
//!     }
//! }
//!
//! assert_eq!(LoadError::Busy.code(), "LOAD_BUSY");
//! assert!(!LoadError::Missing.is_recoverable());
//! ```

/// Stable error code interface.
///
/// Codes are UPPER_SNAKE_CASE, carry a crate prefix, and never change
/// once published.
pub trait ErrorCode {
    /// Returns the machine-readable code.
    fn code(&self) -> &'static str;

    /// Returns `true` if retrying (or a corrective user action) may succeed.
    ///
    /// Configuration errors are never recoverable: the same registration
    /// fails the same way every time.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that `err` follows the code conventions and carries `prefix`.
///
/// # Panics
///
/// Panics if the code is empty, lacks the prefix, or is not UPPER_SNAKE_CASE.
pub fn assert_error_code<E: ErrorCode>(err: &E, prefix: &str) {
    let code = err.code();
    assert!(!code.is_empty(), "error code must not be empty");
    assert!(
        code.starts_with(prefix),
        "error code '{code}' must start with prefix '{prefix}'"
    );
    assert!(
        is_upper_snake_case(code),
        "error code '{code}' must be UPPER_SNAKE_CASE"
    );
}

/// Runs [`assert_error_code`] over every variant in `errors`.
///
/// # Panics
///
/// Panics on the first variant violating the conventions.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], prefix: &str) {
    for err in errors {
        assert_error_code(err, prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('_')
        && !s.ends_with('_')
        && !s.contains("__")
        && s.chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
