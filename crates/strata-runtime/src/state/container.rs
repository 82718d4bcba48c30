//! Committed state plus the current combined reducer.

use super::CombinedReducer;
use crate::error::SliceFailure;
use serde_json::{Map, Value};
use strata_types::Action;

/// Applied once when the container is created.
pub const INIT_ACTION: &str = "@@strata/INIT";

/// Applied whenever the reducer is replaced.
pub const REPLACE_ACTION: &str = "@@strata/REPLACE";

/// Holds the committed global state.
///
/// Every transition is all-or-nothing: if any slice reducer fails, the
/// committed state is left untouched.
#[derive(Debug)]
pub struct StateContainer {
    state: Value,
    reducer: CombinedReducer,
}

impl StateContainer {
    /// Creates a container with no slices and an empty object as state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Value::Object(Map::new()),
            reducer: CombinedReducer::default(),
        }
    }

    /// Committed state.
    #[must_use]
    pub fn state(&self) -> &Value {
        &self.state
    }

    /// Reduces `action` and commits the result.
    ///
    /// # Errors
    ///
    /// The failing slice; nothing is committed.
    pub fn apply(&mut self, action: &Action) -> Result<(), SliceFailure> {
        self.state = self.reducer.reduce(&self.state, action)?;
        Ok(())
    }

    /// Swaps the reducer and applies [`REPLACE_ACTION`] so new slices
    /// appear with their initial value and ejected ones disappear.
    ///
    /// # Errors
    ///
    /// The failing slice; the old reducer and state are kept.
    pub fn replace_reducer(&mut self, reducer: CombinedReducer) -> Result<(), SliceFailure> {
        let next = reducer.reduce(&self.state, &Action::new(REPLACE_ACTION))?;
        self.reducer = reducer;
        self.state = next;
        Ok(())
    }
}

impl Default for StateContainer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ReducerError, ReducerInjector, SliceReducer};
    use serde_json::json;
    use std::sync::Arc;
    use strata_types::{is_reserved_name, SliceKey};

    fn adder() -> SliceReducer {
        Arc::new(|state: Option<&Value>, action: &Action| {
            let n = state.and_then(Value::as_i64).unwrap_or(0);
            match action.action_type() {
                "add" => Ok(json!(n + action.payload.as_i64().unwrap_or(0))),
                _ => Ok(json!(n)),
            }
        })
    }

    #[test]
    fn internal_actions_are_reserved() {
        assert!(is_reserved_name(INIT_ACTION));
        assert!(is_reserved_name(REPLACE_ACTION));
    }

    #[test]
    fn replace_reducer_initializes_new_slice() {
        let mut inj = ReducerInjector::new();
        inj.inject(SliceKey::top("n"), adder()).unwrap();

        let mut container = StateContainer::new();
        assert_eq!(container.state(), &json!({}));
        container.replace_reducer(inj.combine()).unwrap();
        assert_eq!(container.state(), &json!({"n": 0}));

        container
            .apply(&Action::with_payload("add", json!(5)))
            .unwrap();
        assert_eq!(container.state(), &json!({"n": 5}));
    }

    #[test]
    fn failed_apply_commits_nothing() {
        let mut inj = ReducerInjector::new();
        inj.inject(SliceKey::top("a"), adder()).unwrap();
        inj.inject(
            SliceKey::top("z"),
            Arc::new(|state: Option<&Value>, action: &Action| {
                if action.action_type() == "add" {
                    Err(ReducerError::rejected("z refuses"))
                } else {
                    Ok(state.cloned().unwrap_or(Value::Null))
                }
            }),
        )
        .unwrap();

        let mut container = StateContainer::new();
        container.replace_reducer(inj.combine()).unwrap();
        let before = container.state().clone();

        let err = container
            .apply(&Action::with_payload("add", json!(1)))
            .unwrap_err();
        assert_eq!(err.slice, SliceKey::top("z"));
        assert_eq!(container.state(), &before);
    }

    #[test]
    fn failed_replace_keeps_old_reducer() {
        let mut container = StateContainer::new();
        let mut good = ReducerInjector::new();
        good.inject(SliceKey::top("n"), adder()).unwrap();
        container.replace_reducer(good.combine()).unwrap();

        let mut bad = good.clone();
        bad.inject(
            SliceKey::top("broken"),
            Arc::new(|_: Option<&Value>, _: &Action| Err(ReducerError::rejected("no"))),
        )
        .unwrap();
        assert!(container.replace_reducer(bad.combine()).is_err());

        container
            .apply(&Action::with_payload("add", json!(2)))
            .unwrap();
        assert_eq!(container.state(), &json!({"n": 2}));
    }
}
