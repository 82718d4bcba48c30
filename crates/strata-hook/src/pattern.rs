//! Action-type patterns that select which actions a hook sees.
//!
//! ```text
//! "*"          any action
//! "todos/*"    any action whose type starts with "todos/"
//! "todos/add"  exactly "todos/add"
//! ```

use crate::HookError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A parsed action pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ActionPattern {
    /// Matches every action.
    Any,
    /// Matches action types starting with the prefix.
    Prefix(String),
    /// Matches one action type.
    Exact(String),
}

impl ActionPattern {
    /// Parses a pattern.
    ///
    /// A `*` is only allowed as the final character.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::InvalidPattern`] for empty patterns or a
    /// wildcard anywhere but the end.
    pub fn parse(pattern: &str) -> Result<Self, HookError> {
        if pattern.is_empty() {
            return Err(HookError::InvalidPattern("empty pattern".into()));
        }
        if pattern == "*" {
            return Ok(Self::Any);
        }
        match pattern.find('*') {
            None => Ok(Self::Exact(pattern.to_string())),
            Some(pos) if pos == pattern.len() - 1 => {
                Ok(Self::Prefix(pattern[..pos].to_string()))
            }
            Some(_) => Err(HookError::InvalidPattern(format!(
                "wildcard must be trailing in '{pattern}'"
            ))),
        }
    }

    /// Returns `true` if `action_type` is selected by this pattern.
    #[must_use]
    pub fn matches(&self, action_type: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Prefix(prefix) => action_type.starts_with(prefix.as_str()),
            Self::Exact(exact) => exact == action_type,
        }
    }
}

impl fmt::Display for ActionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Prefix(p) => write!(f, "{p}*"),
            Self::Exact(e) => f.write_str(e),
        }
    }
}

impl FromStr for ActionPattern {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ActionPattern {
    type Error = HookError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ActionPattern> for String {
    fn from(p: ActionPattern) -> Self {
        p.to_string()
    }
}
