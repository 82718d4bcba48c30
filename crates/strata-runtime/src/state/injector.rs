//! Reducer injector.

use crate::error::{SliceFailure, StoreError};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use strata_types::{Action, SliceKey};

/// Reducing function for one slice.
///
/// Receives the slice's previous value and the action. The value is
/// `None` when the key is absent from the state (a new slice, which
/// falls back to its initial value); a present `null` is `Some`.
/// Unknown actions must return the state unchanged.
pub type SliceReducer =
    Arc<dyn Fn(Option<&Value>, &Action) -> Result<Value, crate::ReducerError> + Send + Sync>;

/// Accumulates named slice reducers.
///
/// Top-level slice names and namespace keys share one key space: a
/// namespaced slice `ns.a` occupies the top-level key `ns`.
#[derive(Default, Clone)]
pub struct ReducerInjector {
    slices: BTreeMap<SliceKey, SliceReducer>,
}

impl ReducerInjector {
    /// Creates an empty injector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reducer under `key`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::DuplicateSlice`] if `key` is already injected.
    /// - [`StoreError::SliceConflict`] if `key` collides with a namespace
    ///   object (or a namespace collides with a top-level slice).
    pub fn inject(&mut self, key: SliceKey, reducer: SliceReducer) -> Result<(), StoreError> {
        if self.slices.contains_key(&key) {
            return Err(StoreError::DuplicateSlice(key));
        }
        if let Some(existing) = self.conflicting(&key) {
            return Err(StoreError::SliceConflict {
                existing: existing.clone(),
                key,
            });
        }
        self.slices.insert(key, reducer);
        Ok(())
    }

    fn conflicting(&self, key: &SliceKey) -> Option<&SliceKey> {
        self.slices.keys().find(|k| match (&key.namespace, &k.namespace) {
            (None, Some(ns)) => *ns == key.name,
            (Some(ns), None) => k.name == *ns,
            _ => false,
        })
    }

    /// Removes the reducer under `key`. Returns `true` if it existed.
    pub fn eject(&mut self, key: &SliceKey) -> bool {
        self.slices.remove(key).is_some()
    }

    /// Returns `true` if a reducer is injected under `key`.
    #[must_use]
    pub fn contains(&self, key: &SliceKey) -> bool {
        self.slices.contains_key(key)
    }

    /// Number of injected slices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    /// Returns `true` if nothing is injected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Injected keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &SliceKey> {
        self.slices.keys()
    }

    /// Snapshot of the current table as one reducing function.
    #[must_use]
    pub fn combine(&self) -> CombinedReducer {
        CombinedReducer {
            slices: self
                .slices
                .iter()
                .map(|(k, r)| (k.clone(), Arc::clone(r)))
                .collect(),
        }
    }
}

impl fmt::Debug for ReducerInjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReducerInjector")
            .field("slices", &self.slices.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The combined reducing function handed to the state container.
#[derive(Default, Clone)]
pub struct CombinedReducer {
    slices: Vec<(SliceKey, SliceReducer)>,
}

impl CombinedReducer {
    /// Computes the next global state.
    ///
    /// The result holds exactly the registered keys; anything else in
    /// `state` is dropped.
    ///
    /// # Errors
    ///
    /// The first failing slice, tagged with its key.
    pub fn reduce(&self, state: &Value, action: &Action) -> Result<Value, SliceFailure> {
        let mut next = Map::new();
        for (key, reducer) in &self.slices {
            let value = reducer(key.lookup(state), action).map_err(|source| SliceFailure {
                slice: key.clone(),
                source,
            })?;

            match &key.namespace {
                None => {
                    next.insert(key.name.clone(), value);
                }
                Some(ns) => {
                    let group = next
                        .entry(ns.clone())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(members) = group {
                        members.insert(key.name.clone(), value);
                    }
                }
            }
        }
        Ok(Value::Object(next))
    }

    /// Number of slices combined.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    /// Returns `true` if no slices are combined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

impl fmt::Debug for CombinedReducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.slices.iter().map(|(k, _)| k))
            .finish()
    }
}
