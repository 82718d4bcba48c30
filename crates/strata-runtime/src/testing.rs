//! Test utilities for stores, controllers and sagas.
//!
//! - [`Latch`]: a suspension point a saga body can wait on until the
//!   test opens it, to hold an execution "in flight".
//! - [`settle`]: yields until spawned saga tasks have run.
//! - [`ActionLog`]: a post-dispatch hook recording every committed action.
//!
//! ```
//! use strata_runtime::testing::{settle, Latch};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let latch = Latch::new();
//! let waiter = tokio::spawn({
//!     let latch = latch.clone();
//!     async move { latch.wait().await }
//! });
//! settle().await;
//! assert!(!waiter.is_finished());
//!
//! latch.open();
//! waiter.await.unwrap();
//! # }
//! ```

use parking_lot::Mutex;
use std::sync::Arc;
use strata_hook::{ActionPattern, DispatchHook, HookAction, HookPoint};
use strata_types::Action;
use tokio::sync::watch;

/// Number of scheduler turns [`settle`] yields.
const SETTLE_TURNS: usize = 64;

/// One-shot gate shared between a test and the tasks it drives.
#[derive(Debug, Clone)]
pub struct Latch {
    tx: Arc<watch::Sender<bool>>,
}

impl Latch {
    /// Creates a closed latch.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Opens the latch, releasing current and future waiters.
    pub fn open(&self) {
        self.tx.send_replace(true);
    }

    /// Returns `true` once opened.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.tx.borrow()
    }

    /// Waits until the latch is open.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|open| *open).await;
    }
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}

/// Yields to the scheduler repeatedly so that spawned tasks (saga
/// watchers and their executions) make progress.
///
/// Meant for the current-thread runtime `#[tokio::test]` uses.
pub async fn settle() {
    for _ in 0..SETTLE_TURNS {
        tokio::task::yield_now().await;
    }
}

/// Post-dispatch hook that records the type of every committed action.
///
/// Clones share the same log, so keep one and register the other.
#[derive(Debug, Clone)]
pub struct ActionLog {
    id: String,
    pattern: ActionPattern,
    seen: Arc<Mutex<Vec<String>>>,
}

impl ActionLog {
    /// Records every action.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self::matching(id, ActionPattern::Any)
    }

    /// Records actions matching `pattern` only.
    #[must_use]
    pub fn matching(id: &str, pattern: ActionPattern) -> Self {
        Self {
            id: id.to_string(),
            pattern,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Recorded action types, in commit order.
    #[must_use]
    pub fn types(&self) -> Vec<String> {
        self.seen.lock().clone()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.seen.lock().clear();
    }
}

impl DispatchHook for ActionLog {
    fn id(&self) -> &str {
        &self.id
    }

    fn pattern(&self) -> &ActionPattern {
        &self.pattern
    }

    fn hook_point(&self) -> HookPoint {
        HookPoint::PostDispatch
    }

    fn execute(&self, action: &Action) -> HookAction {
        self.seen.lock().push(action.action_type().to_string());
        HookAction::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_latch_releases_late_waiters() {
        let latch = Latch::new();
        assert!(!latch.is_open());
        latch.open();
        assert!(latch.is_open());
        latch.wait().await;
    }

    #[test]
    fn action_log_records_matching() {
        let log = ActionLog::matching("log", ActionPattern::parse("cart/*").unwrap());
        let shared = log.clone();

        assert!(shared.pattern().matches("cart/add"));
        shared.execute(&Action::new("cart/add"));
        assert_eq!(log.types(), vec!["cart/add".to_string()]);

        log.clear();
        assert!(shared.types().is_empty());
    }
}
