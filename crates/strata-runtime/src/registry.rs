//! Controller registry: the lazy-load index.
//!
//! The registry is an explicit object shared (via `Arc`) by every store
//! built from it. It is append-only: a registered type stays indexed
//! forever, and whether it is live is always answered per store.
//!
//! ```text
//! register::<C>()                      dispatch("cart/add") on store S
//!   │ dry-run C::build (detached)         │
//!   ▼                                     ▼
//! ┌─────────────────────────────┐   controller_for_action("cart/add",
//! │ C1: [todos/add, todos/sync] │        is_live = S.instances)
//! │ C2: [cart/add]              │ ──► C2 (first match not live in S)
//! └─────────────────────────────┘
//! ```

use crate::controller::{Controller, ControllerContext};
use crate::saga::SagaSpec;
use crate::state::SliceReducer;
use crate::store::Store;
use crate::{ControllerError, RegistryError, StoreError};
use parking_lot::RwLock;
use std::any::{type_name, TypeId};
use std::fmt;
use std::sync::Arc;
use strata_hook::DispatchHook;
use strata_types::{ControllerId, SliceKey};
use tracing::debug;

/// The per-store operations a controller commit needs.
///
/// [`Store`] implements this; tests can substitute a recording binding.
pub trait StoreBinding {
    /// Injects a slice reducer and replaces the store's reducer.
    ///
    /// # Errors
    ///
    /// Duplicate or conflicting slice keys, or a failing replace.
    fn register_reducer(&self, key: SliceKey, reducer: SliceReducer) -> Result<(), StoreError>;

    /// Ejects a slice reducer. Returns `false` if it was not injected.
    ///
    /// # Errors
    ///
    /// A failing replace.
    fn unregister_reducer(&self, key: &SliceKey) -> Result<bool, StoreError>;

    /// Starts a saga, tracked under `owner` when given.
    ///
    /// # Errors
    ///
    /// No runtime, or the store is destroyed.
    fn register_saga(&self, saga: SagaSpec, owner: Option<ControllerId>) -> Result<(), StoreError>;

    /// Cancels every saga owned by `owner`. Returns how many.
    fn cancel_sagas(&self, owner: &ControllerId) -> usize;

    /// Installs a hook owned by `owner`.
    ///
    /// # Errors
    ///
    /// Duplicate hook ID.
    fn register_hook(&self, hook: Box<dyn DispatchHook>, owner: ControllerId) -> Result<(), StoreError>;

    /// Removes every hook owned by `owner`. Returns how many.
    fn unregister_hooks(&self, owner: &ControllerId) -> usize;
}

/// What the registry knows about one controller type.
pub struct ControllerDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    identity: ControllerId,
    actions: Vec<String>,
    materialize: fn(&Store) -> Result<bool, ControllerError>,
}

impl ControllerDescriptor {
    /// Controller identity.
    #[must_use]
    pub fn identity(&self) -> &ControllerId {
        &self.identity
    }

    /// Rust type name of the controller.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Addressable action names discovered at registration.
    #[must_use]
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Returns `true` if `action_type` is one of the addressable names.
    #[must_use]
    pub fn handles(&self, action_type: &str) -> bool {
        self.actions.iter().any(|a| a == action_type)
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Instantiates the controller on `store` if not already live.
    pub(crate) fn materialize(&self, store: &Store) -> Result<bool, ControllerError> {
        (self.materialize)(store)
    }
}

impl fmt::Debug for ControllerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerDescriptor")
            .field("identity", &self.identity)
            .field("type_name", &self.type_name)
            .field("actions", &self.actions)
            .finish()
    }
}

fn materialize<C: Controller>(store: &Store) -> Result<bool, ControllerError> {
    Ok(store.get_controller::<C>()?.is_some())
}

/// Process-wide table of controller types, in registration order.
#[derive(Default)]
pub struct ControllerRegistry {
    entries: RwLock<Vec<Arc<ControllerDescriptor>>>,
}

impl ControllerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes `C` by the addressable names it declares.
    ///
    /// Registering the same type again is a no-op. The names are found by
    /// running `C::build` against a detached context.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::DuplicateIdentity`] if another type already
    ///   registered `C`'s identity.
    /// - [`RegistryError::Declaration`] if the dry run fails.
    pub fn register<C: Controller>(&self) -> Result<(), RegistryError> {
        let type_id = TypeId::of::<C>();
        let identity = C::identity();
        if self.already_registered(type_id, &identity)? {
            return Ok(());
        }

        let mut ctx = ControllerContext::detached(identity.clone());
        C::build(&mut ctx).map_err(|source| RegistryError::Declaration {
            identity: identity.clone(),
            source,
        })?;
        let actions = ctx.addressable_names();

        let mut entries = self.entries.write();
        if entries.iter().any(|d| d.type_id == type_id) {
            return Ok(());
        }
        if let Some(existing) = entries.iter().find(|d| d.identity == identity) {
            return Err(RegistryError::DuplicateIdentity {
                identity,
                existing: existing.type_name,
            });
        }

        debug!(controller = %identity, actions = ?actions, "controller registered");
        entries.push(Arc::new(ControllerDescriptor {
            type_id,
            type_name: type_name::<C>(),
            identity,
            actions,
            materialize: materialize::<C>,
        }));
        Ok(())
    }

    /// `true` if `type_id` is already indexed; an error if its identity
    /// is taken by another type.
    fn already_registered(
        &self,
        type_id: TypeId,
        identity: &ControllerId,
    ) -> Result<bool, RegistryError> {
        let entries = self.entries.read();
        if entries.iter().any(|d| d.type_id == type_id) {
            return Ok(true);
        }
        match entries.iter().find(|d| &d.identity == identity) {
            Some(existing) => Err(RegistryError::DuplicateIdentity {
                identity: identity.clone(),
                existing: existing.type_name,
            }),
            None => Ok(false),
        }
    }

    /// First registered controller, in registration order, that declares
    /// `action_type` and for which `is_live` is `false`.
    pub fn controller_for_action(
        &self,
        action_type: &str,
        is_live: impl Fn(TypeId) -> bool,
    ) -> Option<Arc<ControllerDescriptor>> {
        self.entries
            .read()
            .iter()
            .find(|d| d.handles(action_type) && !is_live(d.type_id))
            .cloned()
    }

    /// Descriptor of `C`, if registered.
    #[must_use]
    pub fn descriptor<C: Controller>(&self) -> Option<Arc<ControllerDescriptor>> {
        let type_id = TypeId::of::<C>();
        self.entries
            .read()
            .iter()
            .find(|d| d.type_id == type_id)
            .cloned()
    }

    /// Returns `true` if `C` is registered.
    #[must_use]
    pub fn contains<C: Controller>(&self) -> bool {
        self.descriptor::<C>().is_some()
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.read().iter()).finish()
    }
}
