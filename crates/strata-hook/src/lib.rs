//! Dispatch hooks for strata stores.
//!
//! Hooks let cross-cutting concerns (auditing, gating until some
//! resource is ready, rejecting actions in read-only mode) observe or
//! intercept every dispatched action without the controllers knowing.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ strata-runtime : Store, registry, sagas      │
//! ├──────────────────────────────────────────────┤
//! │ strata-hook    : dispatch hooks          ◄── │
//! ├──────────────────────────────────────────────┤
//! │ strata-types   : Action, ids, ErrorCode      │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Core concepts
//!
//! - [`HookPoint`]: `dispatch.pre` (may defer or abort) and
//!   `dispatch.post` (observe only).
//! - [`ActionPattern`]: `"*"`, `"prefix/*"` or an exact action type.
//! - [`DispatchHook`]: a single handler returning a [`HookAction`].
//! - [`HookRegistry`]: priority-ordered hooks per point. A [`HookChain`]
//!   snapshot runs them and produces the [`HookVerdict`] the store acts on.
//!
//! # Example
//!
//! ```
//! use strata_hook::{HookPoint, HookRegistry, HookVerdict};
//! use strata_types::Action;
//!
//! let registry = HookRegistry::new();
//! let verdict = registry.run(HookPoint::PreDispatch, &Action::new("todos/add"));
//! assert!(matches!(verdict, HookVerdict::Proceed));
//! ```

mod action;
mod error;
pub mod hook;
mod pattern;
mod point;
mod registry;

pub use action::{HookAction, Pending};
pub use error::HookError;
pub use hook::DispatchHook;
pub use pattern::ActionPattern;
pub use point::HookPoint;
pub use registry::{HookChain, HookRegistry, HookVerdict};

#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    //! Test utilities for the hook layer.
    pub use crate::hook::testing::MockHook;
}
