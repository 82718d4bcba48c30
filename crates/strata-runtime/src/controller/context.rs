//! Controller construction context.

use super::handles::{slice_reducer, synthesize_name, ActionTable, SharedTable};
use super::{ActionCreator, SagaTrigger, SliceHandle};
use crate::registry::StoreBinding;
use crate::saga::{effect, SagaContext, SagaResult, SagaSpec, WatchStrategy, DEFAULT_DEBOUNCE};
use crate::store::{Store, WeakStore};
use crate::{ControllerError, ReducerError};
use parking_lot::RwLock;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use strata_hook::DispatchHook;
use strata_types::{is_reserved_name, ControllerId};
use tracing::warn;

struct SliceDecl {
    initial: Value,
    table: SharedTable,
    /// `false` while the slice only exists because an action was
    /// registered before `state()`.
    explicit: bool,
}

/// Collects a controller's registrations during
/// [`Controller::build`](super::Controller::build).
///
/// Nothing reaches the store while `build` runs. After `build` returns
/// `Ok`, the store commits the reducer first, then the sagas, then owned
/// hooks; a failure part-way rolls back what was committed.
///
/// During the registry's declaration dry run the context is detached:
/// [`store`](Self::store) returns `None` and handles cannot dispatch.
pub struct ControllerContext {
    identity: ControllerId,
    store: WeakStore,
    default_debounce: Duration,
    slice: Option<SliceDecl>,
    sagas: Vec<SagaSpec>,
    hooks: Vec<Box<dyn DispatchHook>>,
}

impl ControllerContext {
    pub(crate) fn attached(identity: ControllerId, store: &Store) -> Self {
        let mut ctx = Self::detached(identity);
        ctx.store = store.downgrade();
        ctx.default_debounce = store.config().saga.default_debounce();
        ctx
    }

    pub(crate) fn detached(identity: ControllerId) -> Self {
        Self {
            identity,
            store: WeakStore::detached(),
            default_debounce: DEFAULT_DEBOUNCE,
            slice: None,
            sagas: Vec::new(),
            hooks: Vec::new(),
        }
    }

    /// Identity of the controller being built.
    #[must_use]
    pub fn identity(&self) -> &ControllerId {
        &self.identity
    }

    /// The owning store; `None` during the declaration dry run.
    #[must_use]
    pub fn store(&self) -> Option<Store> {
        self.store.upgrade()
    }

    /// Returns `explicit` if given, else a fresh synthesized name.
    #[must_use]
    pub fn create_action_name(&self, explicit: Option<&str>) -> String {
        match explicit {
            Some(name) => name.to_string(),
            None => synthesize_name(&self.identity),
        }
    }

    /// Declares the controller's slice with its initial value.
    ///
    /// # Errors
    ///
    /// [`ControllerError::SliceAlreadyDeclared`] on a second call.
    pub fn state(&mut self, initial: Value) -> Result<SliceHandle, ControllerError> {
        match &mut self.slice {
            Some(decl) if decl.explicit => {
                return Err(ControllerError::SliceAlreadyDeclared(self.identity.clone()));
            }
            Some(decl) => {
                decl.initial = initial;
                decl.explicit = true;
            }
            None => {
                self.slice = Some(SliceDecl {
                    initial,
                    table: Arc::new(RwLock::new(ActionTable::default())),
                    explicit: true,
                });
            }
        }
        Ok(self.slice_handle())
    }

    /// Handle to this controller's slice.
    #[must_use]
    pub fn slice_handle(&self) -> SliceHandle {
        SliceHandle::new(self.identity.slice_key(), self.store.clone())
    }

    /// Registers a mutation under a synthesized action name.
    ///
    /// Declares a `null` slice if [`state`](Self::state) was not called.
    pub fn register_action<F>(&mut self, mutation: F) -> ActionCreator
    where
        F: Fn(&Value, &Value) -> Result<Value, ReducerError> + Send + Sync + 'static,
    {
        let name = self.create_action_name(None);
        let decl = self.slice.get_or_insert_with(|| SliceDecl {
            initial: Value::Null,
            table: Arc::new(RwLock::new(ActionTable::default())),
            explicit: false,
        });
        decl.table.write().insert(name.clone(), Arc::new(mutation));
        ActionCreator::new(name, Arc::clone(&decl.table), self.store.clone())
    }

    /// Starts configuring a saga.
    pub fn create_saga(&mut self) -> SagaBuilder<'_> {
        SagaBuilder {
            ctx: self,
            name: None,
            take: Take::Once,
        }
    }

    /// Installs a dispatch hook owned by this controller. It is removed
    /// together with the controller.
    pub fn register_hook(&mut self, hook: impl DispatchHook + 'static) {
        self.hooks.push(Box::new(hook));
    }

    /// Explicit (non-synthesized) action names this controller answers to.
    pub(crate) fn addressable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .slice
            .iter()
            .flat_map(|decl| {
                decl.table
                    .read()
                    .live_names()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .chain(self.sagas.iter().map(|s| s.action_type.clone()))
            .filter(|name| !is_reserved_name(name))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Commits registrations to `binding`. Returns whether a slice was
    /// registered.
    pub(crate) fn commit(self, binding: &dyn StoreBinding) -> Result<bool, ControllerError> {
        let identity = self.identity.clone();
        let key = identity.slice_key();
        let has_slice = self.slice.is_some();

        if let Some(decl) = self.slice {
            binding.register_reducer(key.clone(), slice_reducer(decl.initial, decl.table))?;
        }

        let rest = self
            .sagas
            .into_iter()
            .try_for_each(|spec| binding.register_saga(spec, Some(identity.clone())))
            .and_then(|()| {
                self.hooks
                    .into_iter()
                    .try_for_each(|hook| binding.register_hook(hook, identity.clone()))
            });

        if let Err(e) = rest {
            warn!(controller = %identity, error = %e, "commit failed, rolling back");
            binding.cancel_sagas(&identity);
            binding.unregister_hooks(&identity);
            if has_slice {
                let _ = binding.unregister_reducer(&key);
            }
            return Err(e.into());
        }
        Ok(has_slice)
    }
}

enum Take {
    Once,
    Strategy(WatchStrategy),
    Named(String),
}

/// Configures one saga. Finish with [`register`](Self::register).
#[must_use = "a saga is only added by calling register()"]
pub struct SagaBuilder<'a> {
    ctx: &'a mut ControllerContext,
    name: Option<String>,
    take: Take,
}

impl SagaBuilder<'_> {
    /// Triggers the saga with an explicit action name instead of a
    /// synthesized one.
    pub fn with_addressable_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Wraps the effect in `strategy`.
    pub fn with_take(mut self, strategy: WatchStrategy) -> Self {
        self.take = Take::Strategy(strategy);
        self
    }

    /// Wraps the effect in a strategy given by name
    /// (see [`WatchStrategy::parse_with_default`]). Checked at
    /// [`register`](Self::register).
    pub fn with_take_named(mut self, strategy: &str) -> Self {
        self.take = Take::Named(strategy.to_string());
        self
    }

    /// Resolves the action name and strategy and adds the saga.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::Saga`] for an unknown or invalid strategy.
    /// - [`ControllerError::ReservedName`] for an explicit name using the
    ///   internal prefix.
    /// - [`ControllerError::DuplicateSagaAction`] if another saga of
    ///   this controller already uses the name.
    pub fn register<F, Fut>(self, effect_fn: F) -> Result<SagaTrigger, ControllerError>
    where
        F: Fn(SagaContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SagaResult> + Send + 'static,
    {
        let strategy = match self.take {
            Take::Once => None,
            Take::Strategy(s) => Some(s),
            Take::Named(name) => Some(WatchStrategy::parse_with_default(
                &name,
                self.ctx.default_debounce,
            )?),
        };
        if let Some(s) = &strategy {
            s.validate()?;
        }

        let action_type = match self.name {
            Some(name) if is_reserved_name(&name) => {
                return Err(ControllerError::ReservedName(name));
            }
            Some(name) => name,
            None => self.ctx.create_action_name(None),
        };
        if self.ctx.sagas.iter().any(|s| s.action_type == action_type) {
            return Err(ControllerError::DuplicateSagaAction {
                controller: self.ctx.identity.clone(),
                action: action_type,
            });
        }

        self.ctx
            .sagas
            .push(SagaSpec::new(action_type.clone(), strategy, effect(effect_fn)));
        Ok(SagaTrigger::new(action_type, self.ctx.store.clone()))
    }
}
