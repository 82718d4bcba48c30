//! Dispatchable handles a controller keeps after `build`.

use crate::error::ControllerError;
use crate::state::SliceReducer;
use crate::store::WeakStore;
use crate::{DispatchError, ReducerError};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use strata_types::{is_reserved_name, Action, ControllerId, SliceKey, RESERVED_PREFIX};

/// Mutating function registered for one action: `(state, payload) -> state`.
pub type Mutation = Arc<dyn Fn(&Value, &Value) -> Result<Value, ReducerError> + Send + Sync>;

/// Action name → mutation. Renamed names keep an inert `None` entry and
/// are never handed out again.
#[derive(Default)]
pub(crate) struct ActionTable {
    entries: HashMap<String, Option<Mutation>>,
}

pub(crate) type SharedTable = Arc<RwLock<ActionTable>>;

impl ActionTable {
    pub(crate) fn insert(&mut self, name: String, mutation: Mutation) {
        self.entries.insert(name, Some(mutation));
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), ControllerError> {
        if from == to {
            return Ok(());
        }
        if self.entries.contains_key(to) {
            return Err(ControllerError::DuplicateAction(to.to_string()));
        }
        let mutation = self.entries.get_mut(from).and_then(Option::take);
        self.entries.insert(to.to_string(), mutation);
        Ok(())
    }

    fn get(&self, name: &str) -> Option<Mutation> {
        self.entries.get(name).cloned().flatten()
    }

    /// Names that still trigger a mutation.
    pub(crate) fn live_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, m)| m.is_some())
            .map(|(name, _)| name.as_str())
    }
}

/// Builds the slice reducer backed by `table`.
///
/// An absent slice starts from `initial`; a slice holding `null` keeps
/// it. Unknown actions return the state unchanged.
pub(crate) fn slice_reducer(initial: Value, table: SharedTable) -> SliceReducer {
    Arc::new(move |state: Option<&Value>, action: &Action| {
        let current = state.unwrap_or(&initial);
        let mutation = table.read().get(action.action_type());
        match mutation {
            Some(mutate) => mutate(current, &action.payload),
            None => Ok(current.clone()),
        }
    })
}

/// Synthesizes `@@strata/<fqn>/<n>` with a process-wide counter per
/// identity. The reserved prefix keeps these apart from explicit names.
pub(crate) fn synthesize_name(identity: &ControllerId) -> String {
    static COUNTERS: OnceLock<Mutex<HashMap<ControllerId, u64>>> = OnceLock::new();
    let seq = {
        let mut counters = COUNTERS.get_or_init(Mutex::default).lock();
        let next = counters.entry(identity.clone()).or_insert(0);
        *next += 1;
        *next
    };
    format!("{RESERVED_PREFIX}{}/{seq}", identity.fqn())
}

/// Dispatchable creator returned by
/// [`ControllerContext::register_action`](super::ControllerContext::register_action).
#[derive(Clone)]
pub struct ActionCreator {
    action_type: String,
    table: SharedTable,
    store: WeakStore,
}

impl ActionCreator {
    pub(crate) fn new(action_type: String, table: SharedTable, store: WeakStore) -> Self {
        Self {
            action_type,
            table,
            store,
        }
    }

    /// Action type this creator produces.
    #[must_use]
    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    /// Builds the action without dispatching it.
    #[must_use]
    pub fn action(&self, payload: Value) -> Action {
        Action::with_payload(self.action_type.clone(), payload)
    }

    /// Dispatches the action to the owning store.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Detached`] for creators from a declaration dry
    /// run, otherwise whatever the dispatch returns.
    pub async fn dispatch(&self, payload: Value) -> Result<Action, DispatchError> {
        self.store.dispatch(self.action(payload)).await
    }

    /// Moves the mutation to an explicit, externally dispatchable name.
    ///
    /// The previous name stays in the table as an inert entry, so it no
    /// longer triggers the mutation.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::ReservedName`] if `name` uses the internal prefix.
    /// - [`ControllerError::DuplicateAction`] if `name` is already used by
    ///   this slice, including names retired by an earlier rename.
    pub fn with_addressable_name(mut self, name: impl Into<String>) -> Result<Self, ControllerError> {
        let name = name.into();
        if is_reserved_name(&name) {
            return Err(ControllerError::ReservedName(name));
        }
        self.table.write().rename(&self.action_type, &name)?;
        self.action_type = name;
        Ok(self)
    }
}

impl fmt::Debug for ActionCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionCreator")
            .field("action_type", &self.action_type)
            .finish_non_exhaustive()
    }
}

/// Trigger returned by [`SagaBuilder::register`](super::SagaBuilder::register).
#[derive(Debug, Clone)]
pub struct SagaTrigger {
    action_type: String,
    store: WeakStore,
}

impl SagaTrigger {
    pub(crate) fn new(action_type: String, store: WeakStore) -> Self {
        Self { action_type, store }
    }

    /// Action type that triggers the saga.
    #[must_use]
    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    /// Builds the trigger action.
    #[must_use]
    pub fn action(&self, payload: Value) -> Action {
        Action::with_payload(self.action_type.clone(), payload)
    }

    /// Dispatches the trigger action.
    ///
    /// # Errors
    ///
    /// Same as [`ActionCreator::dispatch`].
    pub async fn dispatch(&self, payload: Value) -> Result<Action, DispatchError> {
        self.store.dispatch(self.action(payload)).await
    }
}

/// Read access to a controller's slice.
#[derive(Debug, Clone)]
pub struct SliceHandle {
    key: SliceKey,
    store: WeakStore,
}

impl SliceHandle {
    pub(crate) fn new(key: SliceKey, store: WeakStore) -> Self {
        Self { key, store }
    }

    /// Where the slice lives in global state.
    #[must_use]
    pub fn key(&self) -> &SliceKey {
        &self.key
    }

    /// Current slice value; `None` if the store is gone or the slice is
    /// not registered.
    #[must_use]
    pub fn get(&self) -> Option<Value> {
        self.store.upgrade()?.slice(&self.key)
    }
}
