//! Hook registry: ordered execution of dispatch hooks.
//!
//! The store wraps the registry in `Arc<parking_lot::RwLock<_>>`. It takes
//! a [`HookChain`] snapshot under the read lock and runs it after the
//! lock is released, so hooks may modify the registry from `execute`.

use crate::{DispatchHook, HookAction, HookError, HookPoint, Pending};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use strata_types::{Action, ControllerId};

struct RegisteredHook {
    hook: Arc<dyn DispatchHook>,
    enabled: bool,
    /// Controller that installed the hook; removed with it.
    owner: Option<ControllerId>,
}

/// Outcome of running the hook chain for one action.
pub enum HookVerdict {
    /// No hook objected; dispatch continues immediately.
    Proceed,
    /// Await every pending suspension in order, then continue.
    Deferred(Vec<Pending>),
    /// A pre-dispatch hook rejected the action.
    Aborted {
        /// ID of the rejecting hook.
        hook_id: String,
        /// Reason it gave.
        reason: String,
    },
}

impl fmt::Debug for HookVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proceed => f.write_str("Proceed"),
            Self::Deferred(p) => write!(f, "Deferred({} pending)", p.len()),
            Self::Aborted { hook_id, reason } => f
                .debug_struct("Aborted")
                .field("hook_id", hook_id)
                .field("reason", reason)
                .finish(),
        }
    }
}

/// Registry of dispatch hooks, indexed by [`HookPoint`].
///
/// Within a point hooks run in ascending priority; equal priorities run
/// in registration order.
#[derive(Default)]
pub struct HookRegistry {
    hooks: HashMap<HookPoint, Vec<RegisteredHook>>,
}

impl HookRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook and returns its ID.
    ///
    /// # Errors
    ///
    /// [`HookError::DuplicateId`] if the ID is taken.
    pub fn register(&mut self, hook: Box<dyn DispatchHook>) -> Result<String, HookError> {
        self.insert(hook, None)
    }

    /// Registers a hook owned by a controller.
    ///
    /// Owned hooks are dropped by [`unregister_by_owner`](Self::unregister_by_owner)
    /// when the controller is removed.
    ///
    /// # Errors
    ///
    /// [`HookError::DuplicateId`] if the ID is taken.
    pub fn register_owned(
        &mut self,
        hook: Box<dyn DispatchHook>,
        owner: ControllerId,
    ) -> Result<String, HookError> {
        self.insert(hook, Some(owner))
    }

    fn insert(
        &mut self,
        hook: Box<dyn DispatchHook>,
        owner: Option<ControllerId>,
    ) -> Result<String, HookError> {
        let id = hook.id().to_string();
        if self.contains(&id) {
            return Err(HookError::DuplicateId(id));
        }

        let priority = hook.priority();
        let entry = self.hooks.entry(hook.hook_point()).or_default();
        let pos = entry
            .iter()
            .position(|rh| rh.hook.priority() > priority)
            .unwrap_or(entry.len());
        entry.insert(
            pos,
            RegisteredHook {
                hook: Arc::from(hook),
                enabled: true,
                owner,
            },
        );
        Ok(id)
    }

    /// Returns `true` if a hook with `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.hooks
            .values()
            .any(|hooks| hooks.iter().any(|rh| rh.hook.id() == id))
    }

    /// Removes a hook by ID. Returns `true` if it existed.
    pub fn unregister(&mut self, id: &str) -> bool {
        let mut found = false;
        for hooks in self.hooks.values_mut() {
            let before = hooks.len();
            hooks.retain(|rh| rh.hook.id() != id);
            found |= hooks.len() < before;
        }
        found
    }

    /// Removes every hook owned by `owner`. Returns how many were removed.
    pub fn unregister_by_owner(&mut self, owner: &ControllerId) -> usize {
        let mut removed = 0;
        for hooks in self.hooks.values_mut() {
            let before = hooks.len();
            hooks.retain(|rh| rh.owner.as_ref() != Some(owner));
            removed += before - hooks.len();
        }
        removed
    }

    /// Enables or disables a hook.
    ///
    /// # Errors
    ///
    /// [`HookError::NotFound`] if no hook has this ID.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<(), HookError> {
        let rh = self
            .hooks
            .values_mut()
            .flat_map(|hooks| hooks.iter_mut())
            .find(|rh| rh.hook.id() == id)
            .ok_or_else(|| HookError::NotFound(id.to_string()))?;
        rh.enabled = enabled;
        Ok(())
    }

    /// Number of registered hooks across all points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.values().map(Vec::len).sum()
    }

    /// Returns `true` if no hooks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enabled hooks of `point` in execution order.
    #[must_use]
    pub fn chain(&self, point: HookPoint) -> HookChain {
        let hooks = self
            .hooks
            .get(&point)
            .map(|hooks| {
                hooks
                    .iter()
                    .filter(|rh| rh.enabled)
                    .map(|rh| Arc::clone(&rh.hook))
                    .collect()
            })
            .unwrap_or_default();
        HookChain { point, hooks }
    }

    /// Runs the chain for `point` against `action` while borrowing the
    /// registry. See [`HookChain::run`].
    pub fn run(&self, point: HookPoint, action: &Action) -> HookVerdict {
        self.chain(point).run(action)
    }
}

/// Snapshot of the enabled hooks of one point.
///
/// Later registry changes do not affect a chain already taken.
#[derive(Clone)]
pub struct HookChain {
    point: HookPoint,
    hooks: Vec<Arc<dyn DispatchHook>>,
}

impl HookChain {
    /// Number of hooks in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Returns `true` if the chain has no hooks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Runs the chain against `action`.
    ///
    /// - Pattern mismatches are skipped.
    /// - Pre-dispatch: `Abort` stops the chain; `Defer` pendings are
    ///   collected in execution order and the chain continues.
    /// - Post-dispatch: only `Continue` is meaningful; anything else is
    ///   ignored with a warning.
    pub fn run(&self, action: &Action) -> HookVerdict {
        let point = self.point;
        let mut pending = Vec::new();
        for hook in &self.hooks {
            if !hook.pattern().matches(action.action_type()) {
                continue;
            }

            match hook.execute(action) {
                HookAction::Continue => {}
                HookAction::Defer(fut) if point.is_pre() => pending.push(fut),
                HookAction::Abort { reason } if point.is_pre() => {
                    return HookVerdict::Aborted {
                        hook_id: hook.id().to_string(),
                        reason,
                    };
                }
                other => {
                    tracing::warn!(
                        hook_id = hook.id(),
                        point = %point,
                        action = %action,
                        kind = other.kind(),
                        "hook result not allowed at this point, ignoring"
                    );
                }
            }
        }

        if pending.is_empty() {
            HookVerdict::Proceed
        } else {
            HookVerdict::Deferred(pending)
        }
    }
}

impl fmt::Debug for HookChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookChain")
            .field("point", &self.point)
            .field("hooks", &self.hooks.iter().map(|h| h.id()).collect::<Vec<_>>())
            .finish()
    }
}
