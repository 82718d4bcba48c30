//! The action envelope.
//!
//! An [`Action`] is a tagged `{type, payload}` record. It carries no
//! behavior; the action type string is the only "wire format" of the
//! system and is otherwise opaque.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Prefix reserved for names the runtime synthesizes.
///
/// Explicit (addressable) action names may not start with it, which is
/// what keeps synthesized names collision-free.
pub const RESERVED_PREFIX: &str = "@@strata/";

/// Returns `true` if `name` lives in the reserved namespace.
#[must_use]
pub fn is_reserved_name(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

/// A dispatched action.
///
/// # Example
///
/// ```
/// use strata_types::Action;
/// use serde_json::json;
///
/// let action = Action::with_payload("todos/add", json!({"title": "write docs"}));
/// assert_eq!(action.action_type(), "todos/add");
///
/// let wire = serde_json::to_value(&action).unwrap();
/// assert_eq!(wire["type"], "todos/add");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Action type string.
    #[serde(rename = "type")]
    pub action_type: String,
    /// Arbitrary payload, `null` when absent.
    #[serde(default)]
    pub payload: Value,
}

impl Action {
    /// Creates an action with a `null` payload.
    #[must_use]
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            payload: Value::Null,
        }
    }

    /// Creates an action with the given payload.
    #[must_use]
    pub fn with_payload(action_type: impl Into<String>, payload: Value) -> Self {
        Self {
            action_type: action_type.into(),
            payload,
        }
    }

    /// Returns the action type.
    #[must_use]
    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    /// Returns `true` for actions in the reserved namespace.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        is_reserved_name(&self.action_type)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.action_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_has_null_payload() {
        let action = Action::new("ping");
        assert_eq!(action.payload, Value::Null);
        assert_eq!(action.to_string(), "ping");
    }

    #[test]
    fn type_field_is_renamed_on_the_wire() {
        let action = Action::with_payload("counter/add", json!(2));
        let wire = serde_json::to_value(&action).unwrap();
        assert_eq!(wire, json!({"type": "counter/add", "payload": 2}));
    }

    #[test]
    fn missing_payload_deserializes_as_null() {
        let action: Action = serde_json::from_value(json!({"type": "x"})).unwrap();
        assert_eq!(action, Action::new("x"));
    }

    #[test]
    fn reserved_prefix_detection() {
        assert!(Action::new("@@strata/REPLACE").is_internal());
        assert!(!Action::new("strata/REPLACE").is_internal());
        assert!(is_reserved_name("@@strata/counter/0"));
    }
}
