//! Hook action: what a hook asks the store to do next.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// A suspension the store awaits before continuing a dispatch.
pub type Pending = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Result of a single hook execution.
///
/// `Default` is deliberately not implemented: every hook decides
/// explicitly whether the dispatch continues.
pub enum HookAction {
    /// Let the dispatch proceed.
    Continue,
    /// Suspend the dispatch until the future resolves, then proceed
    /// (pre-dispatch only).
    Defer(Pending),
    /// Reject the action (pre-dispatch only).
    Abort {
        /// Why the action was rejected.
        reason: String,
    },
}

impl HookAction {
    /// Wraps a future into [`HookAction::Defer`].
    pub fn defer(fut: impl Future<Output = ()> + Send + 'static) -> Self {
        Self::Defer(Box::pin(fut))
    }

    /// Shorthand for [`HookAction::Abort`].
    pub fn abort(reason: impl Into<String>) -> Self {
        Self::Abort {
            reason: reason.into(),
        }
    }

    /// Variant name, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Defer(_) => "defer",
            Self::Abort { .. } => "abort",
        }
    }

    /// Returns `true` for [`HookAction::Continue`].
    #[must_use]
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }

    /// Returns `true` for [`HookAction::Defer`].
    #[must_use]
    pub fn is_defer(&self) -> bool {
        matches!(self, Self::Defer(_))
    }

    /// Returns `true` for [`HookAction::Abort`].
    #[must_use]
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Abort { .. })
    }
}

impl fmt::Debug for HookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => f.write_str("Continue"),
            Self::Defer(_) => f.write_str("Defer(<pending>)"),
            Self::Abort { reason } => f.debug_struct("Abort").field("reason", reason).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates() {
        assert!(HookAction::Continue.is_continue());
        assert!(HookAction::defer(async {}).is_defer());
        assert!(HookAction::abort("nope").is_abort());
        assert!(!HookAction::Continue.is_abort());
    }

    #[test]
    fn debug_hides_future() {
        assert_eq!(format!("{:?}", HookAction::defer(async {})), "Defer(<pending>)");
        assert_eq!(
            format!("{:?}", HookAction::abort("x")),
            "Abort { reason: \"x\" }"
        );
    }
}
