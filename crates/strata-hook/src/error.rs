//! Error types for the hook layer.

use strata_types::ErrorCode;
use thiserror::Error;

/// Errors raised while configuring hooks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// Action pattern could not be parsed.
    #[error("invalid action pattern: {0}")]
    InvalidPattern(String),

    /// Unknown hook point string.
    #[error("unknown hook point: {0}")]
    UnknownHookPoint(String),

    /// A hook with this ID is already registered.
    #[error("hook already registered: {0}")]
    DuplicateId(String),

    /// No hook with this ID.
    #[error("hook not found: {0}")]
    NotFound(String),
}

impl ErrorCode for HookError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidPattern(_) => "HOOK_INVALID_PATTERN",
            Self::UnknownHookPoint(_) => "HOOK_UNKNOWN_POINT",
            Self::DuplicateId(_) => "HOOK_DUPLICATE_ID",
            Self::NotFound(_) => "HOOK_NOT_FOUND",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
