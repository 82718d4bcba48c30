//! Hook trait and testing utilities.

use crate::{ActionPattern, HookAction, HookPoint};
use strata_types::Action;

/// A dispatch hook.
///
/// Registered with a [`HookRegistry`](crate::HookRegistry) and executed
/// for every dispatched action whose type matches [`pattern`](Self::pattern).
///
/// Pre-dispatch hooks are the only place a dispatch may suspend:
/// returning [`HookAction::Defer`] makes the store await the future
/// before the action reaches controllers, reducers or sagas.
pub trait DispatchHook: Send + Sync {
    /// Unique identifier.
    fn id(&self) -> &str;

    /// Which action types this hook sees.
    fn pattern(&self) -> &ActionPattern;

    /// When this hook fires.
    fn hook_point(&self) -> HookPoint;

    /// Lower runs earlier. Default: 100.
    fn priority(&self) -> i32 {
        100
    }

    /// Inspects the action.
    fn execute(&self, action: &Action) -> HookAction;
}

/// Test utilities for the hook system.
#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use super::*;
    use crate::Pending;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    type ActionFn = Box<dyn Fn(&Action) -> HookAction + Send + Sync>;

    /// A hook driven by a closure, counting its invocations.
    pub struct MockHook {
        /// Hook ID.
        pub id: String,
        /// Action pattern.
        pub pattern: ActionPattern,
        /// Hook point.
        pub point: HookPoint,
        /// Priority.
        pub priority: i32,
        /// Produces the action returned from `execute()`.
        pub action_fn: ActionFn,
        /// Number of `execute()` calls.
        pub call_count: Arc<AtomicUsize>,
    }

    impl MockHook {
        fn build(id: &str, pattern: &str, point: HookPoint, action_fn: ActionFn) -> Self {
            Self {
                id: id.to_string(),
                pattern: ActionPattern::parse(pattern).expect("valid pattern for MockHook"),
                point,
                priority: 100,
                action_fn,
                call_count: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// Always continues.
        pub fn pass_through(id: &str, pattern: &str, point: HookPoint) -> Self {
            Self::build(id, pattern, point, Box::new(|_| HookAction::Continue))
        }

        /// Always aborts with `reason`.
        pub fn aborter(id: &str, pattern: &str, point: HookPoint, reason: &str) -> Self {
            let reason = reason.to_string();
            Self::build(
                id,
                pattern,
                point,
                Box::new(move |_| HookAction::abort(reason.clone())),
            )
        }

        /// Defers every action on the future produced by `make`.
        pub fn deferrer(
            id: &str,
            pattern: &str,
            point: HookPoint,
            make: impl Fn(&Action) -> Pending + Send + Sync + 'static,
        ) -> Self {
            Self::build(
                id,
                pattern,
                point,
                Box::new(move |action| HookAction::Defer(make(action))),
            )
        }

        /// Runs `f` on each action and continues.
        pub fn observer(
            id: &str,
            pattern: &str,
            point: HookPoint,
            f: impl Fn(&Action) + Send + Sync + 'static,
        ) -> Self {
            Self::build(
                id,
                pattern,
                point,
                Box::new(move |action| {
                    f(action);
                    HookAction::Continue
                }),
            )
        }

        /// Sets the priority.
        #[must_use]
        pub fn with_priority(mut self, priority: i32) -> Self {
            self.priority = priority;
            self
        }

        /// Number of times `execute()` ran.
        pub fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    impl DispatchHook for MockHook {
        fn id(&self) -> &str {
            &self.id
        }

        fn pattern(&self) -> &ActionPattern {
            &self.pattern
        }

        fn hook_point(&self) -> HookPoint {
            self.point
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn execute(&self, action: &Action) -> HookAction {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            (self.action_fn)(action)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockHook;
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn pass_through_counts_calls() {
        let hook = MockHook::pass_through("h", "*", HookPoint::PreDispatch);
        assert!(hook.execute(&Action::new("a")).is_continue());
        assert!(hook.execute(&Action::new("b")).is_continue());
        assert_eq!(hook.calls(), 2);
    }

    #[test]
    fn aborter_reports_reason() {
        let hook = MockHook::aborter("h", "*", HookPoint::PreDispatch, "readonly");
        match hook.execute(&Action::new("a")) {
            HookAction::Abort { reason } => assert_eq!(reason, "readonly"),
            other => panic!("expected Abort, got {other:?}"),
        }
    }

    #[test]
    fn observer_sees_action() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in = Arc::clone(&seen);
        let hook = MockHook::observer("h", "*", HookPoint::PostDispatch, move |a| {
            if a.action_type() == "x" {
                seen_in.fetch_add(1, Ordering::SeqCst);
            }
        });
        hook.execute(&Action::new("x"));
        hook.execute(&Action::new("y"));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_priority() {
        let hook = MockHook::pass_through("h", "*", HookPoint::PreDispatch);
        assert_eq!(hook.priority(), 100);
        assert_eq!(hook.with_priority(5).priority(), 5);
    }
}
