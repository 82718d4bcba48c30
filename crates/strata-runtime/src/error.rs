//! Runtime layer errors.
//!
//! All errors implement [`ErrorCode`] for standardized handling.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`ReducerError::Rejected`] | `REDUCER_REJECTED` | No |
//! | [`ReducerError::InvalidPayload`] | `REDUCER_INVALID_PAYLOAD` | No |
//! | [`StoreError::DuplicateSlice`] | `STORE_DUPLICATE_SLICE` | No |
//! | [`StoreError::SliceConflict`] | `STORE_SLICE_CONFLICT` | No |
//! | [`StoreError::Reducer`] | `STORE_REDUCER_FAILED` | No |
//! | [`StoreError::Hook`] | `STORE_HOOK_FAILED` | No |
//! | [`StoreError::NoRuntime`] | `STORE_NO_RUNTIME` | No |
//! | [`StoreError::Destroyed`] | `STORE_DESTROYED` | No |
//! | [`DispatchError::Aborted`] | `DISPATCH_ABORTED` | Yes |
//! | [`DispatchError::DeferTimeout`] | `DISPATCH_DEFER_TIMEOUT` | Yes |
//! | [`DispatchError::Reducer`] | `DISPATCH_REDUCER_FAILED` | No |
//! | [`DispatchError::Controller`] | `DISPATCH_CONTROLLER_FAILED` | No |
//! | [`DispatchError::Detached`] | `DISPATCH_DETACHED` | No |
//! | [`DispatchError::Destroyed`] | `DISPATCH_DESTROYED` | No |
//! | [`ControllerError::SliceAlreadyDeclared`] | `CONTROLLER_SLICE_ALREADY_DECLARED` | No |
//! | [`ControllerError::ReservedName`] | `CONTROLLER_RESERVED_NAME` | No |
//! | [`ControllerError::DuplicateAction`] | `CONTROLLER_DUPLICATE_ACTION` | No |
//! | [`ControllerError::DuplicateSagaAction`] | `CONTROLLER_DUPLICATE_SAGA_ACTION` | No |
//! | [`ControllerError::Saga`] | `CONTROLLER_INVALID_SAGA` | No |
//! | [`ControllerError::CyclicConstruction`] | `CONTROLLER_CYCLIC_CONSTRUCTION` | No |
//! | [`ControllerError::IdentityInUse`] | `CONTROLLER_IDENTITY_IN_USE` | No |
//! | [`ControllerError::Commit`] | `CONTROLLER_COMMIT_FAILED` | No |
//! | [`ControllerError::Build`] | `CONTROLLER_BUILD_FAILED` | No |
//! | [`RegistryError::DuplicateIdentity`] | `REGISTRY_DUPLICATE_IDENTITY` | No |
//! | [`RegistryError::Declaration`] | `REGISTRY_DECLARATION_FAILED` | No |
//! | [`SagaError::UnknownStrategy`] | `SAGA_UNKNOWN_STRATEGY` | No |
//! | [`SagaError::InvalidStrategy`] | `SAGA_INVALID_STRATEGY` | No |
//! | [`SagaError::Failed`] | `SAGA_FAILED` | Yes |
//! | [`SagaError::Dispatch`] | `SAGA_DISPATCH_FAILED` | Yes |
//!
//! # Absence is not an error
//!
//! A missing controller, a store that has gone away, or a slice that is
//! not registered are reported as `None`, never as an error variant.
//! Only configuration mistakes and reducer failures surface here.

use strata_hook::HookError;
use strata_types::{ControllerId, ErrorCode, SliceKey};
use thiserror::Error;

/// Failure raised by a slice reducer or a registered mutation.
///
/// Reducer failures are never swallowed: the dispatch that triggered
/// them fails and the state stays at its previous committed value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReducerError {
    /// The mutation refused the action.
    #[error("mutation rejected: {0}")]
    Rejected(String),

    /// The payload did not have the expected shape.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl ReducerError {
    /// Creates a [`ReducerError::Rejected`].
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

impl From<serde_json::Error> for ReducerError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}

impl ErrorCode for ReducerError {
    fn code(&self) -> &'static str {
        match self {
            Self::Rejected(_) => "REDUCER_REJECTED",
            Self::InvalidPayload(_) => "REDUCER_INVALID_PAYLOAD",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// A [`ReducerError`] tagged with the slice that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("slice '{slice}' failed: {source}")]
pub struct SliceFailure {
    /// Slice whose reducer failed.
    pub slice: SliceKey,
    /// Underlying failure.
    #[source]
    pub source: ReducerError,
}

impl ErrorCode for SliceFailure {
    fn code(&self) -> &'static str {
        self.source.code()
    }

    fn is_recoverable(&self) -> bool {
        self.source.is_recoverable()
    }
}

/// Errors from reducer injection and store plumbing.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A reducer is already injected under this key.
    #[error("slice already registered: {0}")]
    DuplicateSlice(SliceKey),

    /// A top-level slice name collides with a namespace key (or vice versa).
    #[error("slice '{key}' conflicts with existing slice '{existing}'")]
    SliceConflict {
        /// Key being injected.
        key: SliceKey,
        /// Key already occupying the name.
        existing: SliceKey,
    },

    /// Applying the replace action with the new reducer failed.
    #[error(transparent)]
    Reducer(#[from] SliceFailure),

    /// Installing a controller-owned hook failed.
    #[error("hook registration failed: {0}")]
    Hook(#[from] HookError),

    /// Sagas need a running tokio runtime.
    #[error("no tokio runtime available to run sagas")]
    NoRuntime,

    /// The store was destroyed.
    #[error("store destroyed")]
    Destroyed,
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::DuplicateSlice(_) => "STORE_DUPLICATE_SLICE",
            Self::SliceConflict { .. } => "STORE_SLICE_CONFLICT",
            Self::Reducer(_) => "STORE_REDUCER_FAILED",
            Self::Hook(_) => "STORE_HOOK_FAILED",
            Self::NoRuntime => "STORE_NO_RUNTIME",
            Self::Destroyed => "STORE_DESTROYED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Errors returned by [`Store::dispatch`](crate::Store::dispatch).
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// A pre-dispatch hook rejected the action.
    #[error("action rejected by hook '{hook_id}': {reason}")]
    Aborted {
        /// Rejecting hook.
        hook_id: String,
        /// Reason given by the hook.
        reason: String,
    },

    /// Deferred hooks did not resolve within `dispatch.defer_timeout_ms`.
    #[error("deferred dispatch of '{action}' timed out after {after_ms}ms")]
    DeferTimeout {
        /// Action type that was waiting.
        action: String,
        /// Configured timeout.
        after_ms: u64,
    },

    /// A slice reducer failed; nothing was committed.
    #[error(transparent)]
    Reducer(#[from] SliceFailure),

    /// Lazily instantiating a controller for this action failed.
    #[error("lazy controller load failed: {0}")]
    Controller(#[from] ControllerError),

    /// The handle is not bound to a store (declaration dry run).
    #[error("handle is not attached to a store")]
    Detached,

    /// The store was destroyed (or dropped).
    #[error("store destroyed")]
    Destroyed,
}

impl ErrorCode for DispatchError {
    fn code(&self) -> &'static str {
        match self {
            Self::Aborted { .. } => "DISPATCH_ABORTED",
            Self::DeferTimeout { .. } => "DISPATCH_DEFER_TIMEOUT",
            Self::Reducer(_) => "DISPATCH_REDUCER_FAILED",
            Self::Controller(_) => "DISPATCH_CONTROLLER_FAILED",
            Self::Detached => "DISPATCH_DETACHED",
            Self::Destroyed => "DISPATCH_DESTROYED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Aborted { .. } | Self::DeferTimeout { .. })
    }
}

/// Controller declaration and lifecycle errors.
#[derive(Debug, Clone, Error)]
pub enum ControllerError {
    /// `state()` was called twice during one build.
    #[error("controller {0} already declared its slice")]
    SliceAlreadyDeclared(ControllerId),

    /// Explicit names may not use the internal prefix.
    #[error("action name '{0}' uses the reserved prefix")]
    ReservedName(String),

    /// The addressable name is already used, or was retired, in this slice.
    #[error("action '{0}' is already registered")]
    DuplicateAction(String),

    /// Two sagas of one controller resolved to the same action name.
    #[error("controller {controller} already has a saga on '{action}'")]
    DuplicateSagaAction {
        /// Owning controller.
        controller: ControllerId,
        /// Colliding action name.
        action: String,
    },

    /// The saga's watcher strategy is unknown or invalid.
    #[error("invalid saga: {0}")]
    Saga(#[from] SagaError),

    /// The controller requested itself while being constructed.
    #[error("cyclic construction of controller {0}")]
    CyclicConstruction(ControllerId),

    /// A different controller type is live under this identity.
    #[error("identity {identity} is in use by {existing}")]
    IdentityInUse {
        /// Contested identity.
        identity: ControllerId,
        /// Type name of the live controller.
        existing: &'static str,
    },

    /// Committing the controller's registrations to the store failed.
    #[error("commit failed: {0}")]
    Commit(#[from] StoreError),

    /// Raised by the controller's own `build`.
    #[error("build failed: {0}")]
    Build(String),
}

impl ControllerError {
    /// Creates a [`ControllerError::Build`].
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build(message.into())
    }
}

impl ErrorCode for ControllerError {
    fn code(&self) -> &'static str {
        match self {
            Self::SliceAlreadyDeclared(_) => "CONTROLLER_SLICE_ALREADY_DECLARED",
            Self::ReservedName(_) => "CONTROLLER_RESERVED_NAME",
            Self::DuplicateAction(_) => "CONTROLLER_DUPLICATE_ACTION",
            Self::DuplicateSagaAction { .. } => "CONTROLLER_DUPLICATE_SAGA_ACTION",
            Self::Saga(_) => "CONTROLLER_INVALID_SAGA",
            Self::CyclicConstruction(_) => "CONTROLLER_CYCLIC_CONSTRUCTION",
            Self::IdentityInUse { .. } => "CONTROLLER_IDENTITY_IN_USE",
            Self::Commit(_) => "CONTROLLER_COMMIT_FAILED",
            Self::Build(_) => "CONTROLLER_BUILD_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Controller registration errors.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// Another controller type already registered this identity.
    #[error("identity {identity} already registered by {existing}")]
    DuplicateIdentity {
        /// Contested identity.
        identity: ControllerId,
        /// Type name of the first registrant.
        existing: &'static str,
    },

    /// The declaration dry run failed.
    #[error("declaring controller {identity} failed: {source}")]
    Declaration {
        /// Controller being registered.
        identity: ControllerId,
        /// Build failure.
        #[source]
        source: ControllerError,
    },
}

impl ErrorCode for RegistryError {
    fn code(&self) -> &'static str {
        match self {
            Self::DuplicateIdentity { .. } => "REGISTRY_DUPLICATE_IDENTITY",
            Self::Declaration { .. } => "REGISTRY_DECLARATION_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Saga configuration and execution errors.
#[derive(Debug, Clone, Error)]
pub enum SagaError {
    /// The strategy name is not one of the built-in watchers.
    #[error("unknown watcher strategy '{0}'")]
    UnknownStrategy(String),

    /// The strategy is known but misconfigured.
    #[error("invalid watcher strategy: {0}")]
    InvalidStrategy(String),

    /// Returned by an effect process.
    #[error("saga failed: {0}")]
    Failed(String),

    /// `put` from inside a saga failed.
    #[error("saga dispatch failed: {0}")]
    Dispatch(Box<DispatchError>),
}

impl SagaError {
    /// Creates a [`SagaError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl From<DispatchError> for SagaError {
    fn from(err: DispatchError) -> Self {
        Self::Dispatch(Box::new(err))
    }
}

impl ErrorCode for SagaError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownStrategy(_) => "SAGA_UNKNOWN_STRATEGY",
            Self::InvalidStrategy(_) => "SAGA_INVALID_STRATEGY",
            Self::Failed(_) => "SAGA_FAILED",
            Self::Dispatch(_) => "SAGA_DISPATCH_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Dispatch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_types::assert_error_codes;

    fn slice_failure() -> SliceFailure {
        SliceFailure {
            slice: SliceKey::top("todos"),
            source: ReducerError::rejected("empty title"),
        }
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(
            &[
                ReducerError::rejected("x"),
                ReducerError::InvalidPayload("x".into()),
            ],
            "REDUCER_",
        );
        assert_error_codes(
            &[
                StoreError::DuplicateSlice(SliceKey::top("a")),
                StoreError::SliceConflict {
                    key: SliceKey::top("ns"),
                    existing: SliceKey::nested("ns", "a"),
                },
                StoreError::Reducer(slice_failure()),
                StoreError::Hook(HookError::DuplicateId("h".into())),
                StoreError::NoRuntime,
                StoreError::Destroyed,
            ],
            "STORE_",
        );
        assert_error_codes(
            &[
                DispatchError::Aborted {
                    hook_id: "h".into(),
                    reason: "r".into(),
                },
                DispatchError::DeferTimeout {
                    action: "a".into(),
                    after_ms: 10,
                },
                DispatchError::Reducer(slice_failure()),
                DispatchError::Controller(ControllerError::build("x")),
                DispatchError::Detached,
                DispatchError::Destroyed,
            ],
            "DISPATCH_",
        );
        let id = ControllerId::new("cart");
        assert_error_codes(
            &[
                ControllerError::SliceAlreadyDeclared(id.clone()),
                ControllerError::ReservedName("@@strata/x".into()),
                ControllerError::DuplicateAction("x".into()),
                ControllerError::DuplicateSagaAction {
                    controller: id.clone(),
                    action: "x".into(),
                },
                ControllerError::Saga(SagaError::UnknownStrategy("x".into())),
                ControllerError::CyclicConstruction(id.clone()),
                ControllerError::IdentityInUse {
                    identity: id.clone(),
                    existing: "Other",
                },
                ControllerError::Commit(StoreError::Destroyed),
                ControllerError::build("x"),
            ],
            "CONTROLLER_",
        );
        assert_error_codes(
            &[
                RegistryError::DuplicateIdentity {
                    identity: id.clone(),
                    existing: "Other",
                },
                RegistryError::Declaration {
                    identity: id,
                    source: ControllerError::build("x"),
                },
            ],
            "REGISTRY_",
        );
        assert_error_codes(
            &[
                SagaError::UnknownStrategy("x".into()),
                SagaError::InvalidStrategy("x".into()),
                SagaError::failed("x"),
                SagaError::from(DispatchError::Detached),
            ],
            "SAGA_",
        );
    }

    #[test]
    fn slice_failure_display_names_slice() {
        assert_eq!(
            slice_failure().to_string(),
            "slice 'todos' failed: mutation rejected: empty title"
        );
        assert_eq!(slice_failure().code(), "REDUCER_REJECTED");
    }

    #[test]
    fn serde_error_becomes_invalid_payload() {
        let err = serde_json::from_str::<u32>("\"nope\"").unwrap_err();
        let reducer_err = ReducerError::from(err);
        assert!(matches!(reducer_err, ReducerError::InvalidPayload(_)));
    }

    #[test]
    fn recoverability() {
        assert!(DispatchError::Aborted {
            hook_id: "h".into(),
            reason: "r".into()
        }
        .is_recoverable());
        assert!(!DispatchError::Destroyed.is_recoverable());
        assert!(SagaError::failed("x").is_recoverable());
        assert!(!SagaError::UnknownStrategy("x".into()).is_recoverable());
    }

    #[test]
    fn unknown_strategy_message_names_strategy() {
        let err = ControllerError::from(SagaError::UnknownStrategy("take_most".into()));
        assert_eq!(
            err.to_string(),
            "invalid saga: unknown watcher strategy 'take_most'"
        );
    }
}
