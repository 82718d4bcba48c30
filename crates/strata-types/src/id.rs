//! Identifier types.
//!
//! [`ControllerId`] is the process-wide identity of a controller type,
//! [`SliceKey`] the location of its state in the global state tree, and
//! [`StoreId`] a random tag that distinguishes stores in logs.

use crate::ErrorCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Error parsing a [`ControllerId`] from its `ns::name` form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The name part is empty.
    #[error("controller name must not be empty")]
    EmptyName,
    /// More than one `::` separator.
    #[error("malformed controller id: {0}")]
    Malformed(String),
}

impl ErrorCode for IdError {
    fn code(&self) -> &'static str {
        match self {
            Self::EmptyName => "TYPES_EMPTY_NAME",
            Self::Malformed(_) => "TYPES_MALFORMED_ID",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Identity of a controller: `(name, namespace)`.
///
/// `name` must be unique within its namespace. An empty namespace is
/// normalized to `None`, so `""` and "no namespace" are one bucket.
///
/// # Example
///
/// ```
/// use strata_types::ControllerId;
///
/// let plain = ControllerId::new("todos");
/// let empty_ns = ControllerId::namespaced("", "todos");
/// assert_eq!(plain, empty_ns);
///
/// let scoped = ControllerId::namespaced("admin", "todos");
/// assert_eq!(scoped.fqn(), "admin::todos");
/// assert_ne!(plain, scoped);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawControllerId")]
pub struct ControllerId {
    namespace: Option<String>,
    name: String,
}

#[derive(Deserialize)]
struct RawControllerId {
    #[serde(default)]
    namespace: Option<String>,
    name: String,
}

impl From<RawControllerId> for ControllerId {
    fn from(raw: RawControllerId) -> Self {
        Self::with_namespace(raw.namespace, raw.name)
    }
}

impl ControllerId {
    /// Creates an identity in the empty namespace.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    /// Creates an identity in `namespace`.
    #[must_use]
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_namespace(Some(namespace.into()), name)
    }

    /// Creates an identity from an optional namespace.
    #[must_use]
    pub fn with_namespace(namespace: Option<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.filter(|ns| !ns.is_empty()),
            name: name.into(),
        }
    }

    /// Controller name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace, `None` for the empty namespace.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Fully qualified name: `ns::name`, or `name` without namespace.
    #[must_use]
    pub fn fqn(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}::{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Where this controller's state slice lives.
    #[must_use]
    pub fn slice_key(&self) -> SliceKey {
        SliceKey {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}::{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl FromStr for ControllerId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split("::");
        let (ns, name) = match (parts.next(), parts.next(), parts.next()) {
            (Some(name), None, None) => (None, name),
            (Some(ns), Some(name), None) => (Some(ns.to_string()), name),
            _ => return Err(IdError::Malformed(s.to_string())),
        };
        if name.is_empty() {
            return Err(IdError::EmptyName);
        }
        Ok(Self::with_namespace(ns, name))
    }
}

/// Location of a state slice: a top-level key, or a key nested under
/// its namespace object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SliceKey {
    /// Namespace object the slice nests under.
    pub namespace: Option<String>,
    /// Slice name.
    pub name: String,
}

impl SliceKey {
    /// Top-level slice key.
    #[must_use]
    pub fn top(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    /// Slice key nested under `namespace`.
    #[must_use]
    pub fn nested(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        let namespace: String = namespace.into();
        Self {
            namespace: Some(namespace).filter(|ns| !ns.is_empty()),
            name: name.into(),
        }
    }

    /// Reads this slice out of a global state value.
    #[must_use]
    pub fn lookup<'a>(&self, state: &'a serde_json::Value) -> Option<&'a serde_json::Value> {
        match &self.namespace {
            Some(ns) => state.get(ns)?.get(&self.name),
            None => state.get(&self.name),
        }
    }
}

impl fmt::Display for SliceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Random per-store identifier used for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreId(Uuid);

impl StoreId {
    /// Creates a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for StoreId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 8 hex chars are enough to tell stores apart in logs.
        let s = self.0.simple().to_string();
        f.write_str(&s[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn empty_namespace_is_no_namespace() {
        let a = ControllerId::new("cart");
        let b = ControllerId::namespaced("", "cart");
        let c = ControllerId::with_namespace(Some(String::new()), "cart");
        assert_eq!(a, b);
        assert_eq!(b, c);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn deserialize_normalizes_namespace() {
        let id: ControllerId =
            serde_json::from_value(json!({"namespace": "", "name": "cart"})).unwrap();
        assert_eq!(id, ControllerId::new("cart"));
        assert_eq!(id.namespace(), None);
    }

    #[test]
    fn fqn_and_display() {
        let id = ControllerId::namespaced("shop", "cart");
        assert_eq!(id.fqn(), "shop::cart");
        assert_eq!(id.to_string(), "shop::cart");
        assert_eq!(ControllerId::new("cart").fqn(), "cart");
    }

    #[test]
    fn parse_from_str() {
        assert_eq!(
            "shop::cart".parse::<ControllerId>().unwrap(),
            ControllerId::namespaced("shop", "cart")
        );
        assert_eq!(
            "cart".parse::<ControllerId>().unwrap(),
            ControllerId::new("cart")
        );
        assert_eq!("".parse::<ControllerId>(), Err(IdError::EmptyName));
        assert!(matches!(
            "a::b::c".parse::<ControllerId>(),
            Err(IdError::Malformed(_))
        ));
    }

    #[test]
    fn slice_key_lookup() {
        let state = json!({"cart": 1, "shop": {"cart": 2}});
        assert_eq!(ControllerId::new("cart").slice_key().lookup(&state), Some(&json!(1)));
        assert_eq!(
            ControllerId::namespaced("shop", "cart").slice_key().lookup(&state),
            Some(&json!(2))
        );
        assert_eq!(SliceKey::top("missing").lookup(&state), None);
        assert_eq!(SliceKey::nested("shop", "cart").to_string(), "shop.cart");
    }

    #[test]
    fn id_error_codes() {
        crate::assert_error_codes(
            &[IdError::EmptyName, IdError::Malformed("x".into())],
            "TYPES_",
        );
    }

    #[test]
    fn store_ids_are_distinct() {
        let a = StoreId::new();
        let b = StoreId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 8);
    }
}
