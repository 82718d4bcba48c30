//! Controllers: named, store-scoped owners of a state slice and/or sagas.
//!
//! A controller type declares everything it owns in
//! [`Controller::build`] through a [`ControllerContext`]:
//!
//! ```
//! use serde_json::{json, Value};
//! use strata_runtime::{ActionCreator, Controller, ControllerContext, ControllerError, SliceHandle};
//!
//! struct Counter {
//!     slice: SliceHandle,
//!     increment: ActionCreator,
//! }
//!
//! impl Controller for Counter {
//!     fn build(ctx: &mut ControllerContext) -> Result<Self, ControllerError> {
//!         let slice = ctx.state(json!(0))?;
//!         let increment = ctx
//!             .register_action(|state: &Value, by: &Value| {
//!                 Ok(json!(state.as_i64().unwrap_or(0) + by.as_i64().unwrap_or(1)))
//!             })
//!             .with_addressable_name("counter/increment")?;
//!         Ok(Self { slice, increment })
//!     }
//! }
//!
//! assert_eq!(Counter::identity().to_string(), "Counter");
//! ```
//!
//! A controller with a slice is a "state controller"; one with only
//! sagas is a "stateless controller". Both kinds go through the same
//! trait: the difference is only in what `build` declares.

mod context;
mod handles;

pub use context::{ControllerContext, SagaBuilder};
pub use handles::{ActionCreator, Mutation, SagaTrigger, SliceHandle};

use crate::store::Store;
use crate::ControllerError;
use std::sync::Arc;
use strata_types::ControllerId;

/// A lazily instantiated, store-scoped controller.
///
/// At most one instance exists per `(type, store)` pair.
pub trait Controller: Sized + Send + Sync + 'static {
    /// Controller name. Defaults to the type's short name; override it
    /// when two types could share a short name.
    fn name() -> String {
        short_type_name::<Self>().to_string()
    }

    /// Namespace grouping this controller's slice; `None` by default.
    fn namespace() -> Option<String> {
        None
    }

    /// `(namespace, name)` identity.
    fn identity() -> ControllerId {
        ControllerId::with_namespace(Self::namespace(), Self::name())
    }

    /// Declares the controller's slice, actions, sagas and hooks.
    ///
    /// Also runs once against a detached context when the type is
    /// registered with a [`ControllerRegistry`](crate::ControllerRegistry),
    /// so it must not have side effects outside the context.
    ///
    /// # Errors
    ///
    /// Any [`ControllerError`]; nothing is committed to the store.
    fn build(ctx: &mut ControllerContext) -> Result<Self, ControllerError>;

    /// Returns the instance bound to `store`, constructing it on first use.
    ///
    /// # Errors
    ///
    /// Construction failures. A destroyed store yields `Ok(None)`.
    fn get_instance(store: &Store) -> Result<Option<Arc<Self>>, ControllerError> {
        store.get_controller::<Self>()
    }

    /// Tears down the instance bound to `store`. Returns `false` if there
    /// was none.
    fn remove_instance(store: &Store) -> bool {
        store.remove_controller::<Self>()
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
