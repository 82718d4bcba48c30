//! Hook points along the dispatch path.

use crate::HookError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where in `dispatch` a hook fires.
///
/// ```text
/// dispatch(action)
///   ├── PreDispatch   may defer or abort
///   ├── lazy controller instantiation
///   ├── reduce + notify subscribers + deliver to sagas
///   └── PostDispatch  observe only
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookPoint {
    /// Before the action reaches controllers, reducers or sagas.
    PreDispatch,
    /// After the action has been reduced and delivered.
    PostDispatch,
}

impl HookPoint {
    /// All hook points.
    pub const ALL: [HookPoint; 2] = [Self::PreDispatch, Self::PostDispatch];

    /// Canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreDispatch => "dispatch.pre",
            Self::PostDispatch => "dispatch.post",
        }
    }

    /// Returns `true` for points that may defer or abort.
    #[must_use]
    pub fn is_pre(&self) -> bool {
        matches!(self, Self::PreDispatch)
    }

    /// Returns `true` for observe-only points.
    #[must_use]
    pub fn is_post(&self) -> bool {
        matches!(self, Self::PostDispatch)
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookPoint {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| HookError::UnknownHookPoint(s.to_string()))
    }
}
