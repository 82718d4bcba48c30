//! Strata runtime: lazily instantiated controllers over a single store.
//!
//! Feature modules declare *controllers*. A controller owns a slice of
//! global state with its actions, or a set of background sagas, or both.
//! Controllers are created on first reference or on the first dispatched
//! action that names one of their actions, and are torn down explicitly.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  strata-types : Action, ControllerId, SliceKey, ErrorCode   │
//! │  strata-hook  : DispatchHook, HookRegistry                  │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Runtime Layer (THIS CRATE)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  store       : Store, dispatch pipeline, controller table   │
//! │  registry    : ControllerRegistry (lazy-load index)         │
//! │  controller  : Controller trait, context, action creators   │
//! │  state       : ReducerInjector, StateContainer, listeners   │
//! │  saga        : watcher strategies, SagaRuntime              │
//! │  config      : StrataConfig, ConfigLoader                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::{json, Value};
//! use strata_runtime::{Controller, ControllerContext, ControllerError, ControllerRegistry, Store};
//! use strata_types::Action;
//!
//! struct Counter;
//!
//! impl Controller for Counter {
//!     fn build(ctx: &mut ControllerContext) -> Result<Self, ControllerError> {
//!         ctx.state(json!(0))?;
//!         ctx.register_action(|state: &Value, _payload: &Value| Ok(json!(state.as_i64().unwrap_or(0) + 1)))
//!             .with_addressable_name("counter/inc")?;
//!         Ok(Counter)
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = Arc::new(ControllerRegistry::new());
//! registry.register::<Counter>().unwrap();
//! let store = Store::new(registry);
//!
//! // No code referenced Counter; the action alone brings it to life.
//! store.dispatch(Action::new("counter/inc")).await.unwrap();
//! assert_eq!(store.state(), json!({ "Counter": 1 }));
//! assert!(store.is_live::<Counter>());
//! # }
//! ```

pub mod config;
mod controller;
mod error;
pub mod logging;
mod registry;
mod saga;
mod state;
mod store;
pub mod testing;

pub use controller::{
    ActionCreator, Controller, ControllerContext, Mutation, SagaBuilder, SagaTrigger, SliceHandle,
};
pub use error::{
    ControllerError, DispatchError, ReducerError, RegistryError, SagaError, SliceFailure,
    StoreError,
};
pub use registry::{ControllerDescriptor, ControllerRegistry, StoreBinding};
pub use saga::{effect, Effect, EffectFuture, SagaContext, SagaResult, SagaRuntime, SagaSpec, WatchStrategy};
pub use state::{
    CombinedReducer, Listener, ReducerInjector, SliceReducer, StateContainer, Subscription,
    INIT_ACTION, REPLACE_ACTION,
};
pub use store::{Store, StoreBuilder, WeakStore};

// Re-exported so controllers need only this crate.
pub use strata_hook::{ActionPattern, DispatchHook, HookAction, HookPoint, HookRegistry};
pub use strata_types::{Action, ControllerId, SliceKey, StoreId};
