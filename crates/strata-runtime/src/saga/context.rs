//! What an effect process sees while it runs.

use crate::store::{Store, WeakStore};
use crate::{DispatchError, SagaError};
use strata_types::Action;

/// Result of one effect execution. Failures are logged by the watcher
/// and do not stop it.
pub type SagaResult = Result<(), SagaError>;

/// Context handed to every effect execution.
#[derive(Debug, Clone)]
pub struct SagaContext {
    store: WeakStore,
    action: Option<Action>,
}

impl SagaContext {
    pub(crate) fn new(store: WeakStore, action: Option<Action>) -> Self {
        Self { store, action }
    }

    /// The store this saga runs under, if it is still alive.
    ///
    /// This is how an effect reaches state and other controllers
    /// without capturing the store in its closure.
    #[must_use]
    pub fn store(&self) -> Option<Store> {
        self.store.upgrade()
    }

    /// The action that started this execution; `None` for run-once sagas.
    #[must_use]
    pub fn action(&self) -> Option<&Action> {
        self.action.as_ref()
    }

    /// Payload of the triggering action, `Null` if there is none.
    #[must_use]
    pub fn payload(&self) -> &serde_json::Value {
        static NULL: serde_json::Value = serde_json::Value::Null;
        self.action.as_ref().map_or(&NULL, |a| &a.payload)
    }

    /// Dispatches `action` to the owning store.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Destroyed`] if the store is gone, otherwise
    /// whatever the dispatch returns.
    pub async fn put(&self, action: Action) -> Result<Action, DispatchError> {
        self.store.dispatch(action).await
    }
}
