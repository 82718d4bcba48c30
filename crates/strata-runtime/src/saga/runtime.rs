//! Saga runtime: starts watchers, fans actions out, cancels by owner.

use super::{watcher, SagaSpec};
use crate::store::WeakStore;
use crate::StoreError;
use parking_lot::Mutex;
use std::sync::Arc;
use strata_types::{Action, ControllerId};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::AbortHandle;
use tracing::debug;

struct Watcher {
    action_type: Arc<str>,
    owner: Option<ControllerId>,
    /// `None` for run-once sagas.
    tx: Option<UnboundedSender<Action>>,
    task: AbortHandle,
}

/// Owns every saga task started for one store.
///
/// Channels are unbounded so [`deliver`](Self::deliver) never blocks or
/// drops an action; per-watcher order equals delivery order.
#[derive(Default)]
pub struct SagaRuntime {
    watchers: Mutex<Vec<Watcher>>,
}

impl SagaRuntime {
    /// Creates an empty runtime.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `spec` on the current tokio runtime.
    ///
    /// The action channel exists as soon as this returns, so an action
    /// delivered right after is seen by the new watcher.
    ///
    /// # Errors
    ///
    /// [`StoreError::NoRuntime`] outside a tokio runtime.
    pub fn spawn(
        &self,
        spec: SagaSpec,
        owner: Option<ControllerId>,
        store: WeakStore,
    ) -> Result<(), StoreError> {
        let handle = Handle::try_current().map_err(|_| StoreError::NoRuntime)?;
        let saga: Arc<str> = Arc::from(spec.action_type.as_str());

        let (tx, task) = match spec.strategy {
            None => {
                let task = handle.spawn(watcher::run_once(Arc::clone(&saga), spec.effect, store));
                (None, task.abort_handle())
            }
            Some(strategy) => {
                let (tx, rx) = mpsc::unbounded_channel();
                let task = handle.spawn(watcher::watch(
                    Arc::clone(&saga),
                    strategy,
                    spec.effect,
                    store,
                    rx,
                ));
                (Some(tx), task.abort_handle())
            }
        };

        debug!(
            saga = %saga,
            owner = owner.as_ref().map(ToString::to_string).as_deref().unwrap_or("-"),
            "saga spawned"
        );

        let mut watchers = self.watchers.lock();
        watchers.retain(|w| !w.task.is_finished());
        watchers.push(Watcher {
            action_type: saga,
            owner,
            tx,
            task,
        });
        Ok(())
    }

    /// Hands `action` to every watcher listening for its type, in
    /// registration order. Returns how many watchers received it.
    pub fn deliver(&self, action: &Action) -> usize {
        let watchers = self.watchers.lock();
        watchers
            .iter()
            .filter(|w| &*w.action_type == action.action_type())
            .filter_map(|w| w.tx.as_ref())
            .filter(|tx| tx.send(action.clone()).is_ok())
            .count()
    }

    /// Aborts every saga started for `owner`, including in-flight
    /// executions. Returns how many watchers were cancelled.
    pub fn cancel_owner(&self, owner: &ControllerId) -> usize {
        let mut watchers = self.watchers.lock();
        let before = watchers.len();
        watchers.retain(|w| {
            if w.owner.as_ref() == Some(owner) {
                w.task.abort();
                false
            } else {
                true
            }
        });
        let cancelled = before - watchers.len();
        if cancelled > 0 {
            debug!(controller = %owner, cancelled, "sagas cancelled");
        }
        cancelled
    }

    /// Aborts every saga. Returns how many watchers were cancelled.
    pub fn cancel_all(&self) -> usize {
        let mut watchers = self.watchers.lock();
        for w in watchers.iter() {
            w.task.abort();
        }
        let cancelled = watchers.len();
        watchers.clear();
        cancelled
    }

    /// Number of sagas whose task has not finished.
    #[must_use]
    pub fn active(&self) -> usize {
        self.watchers
            .lock()
            .iter()
            .filter(|w| !w.task.is_finished())
            .count()
    }

    /// Number of sagas owned by `owner` still tracked.
    #[must_use]
    pub fn owned_by(&self, owner: &ControllerId) -> usize {
        self.watchers
            .lock()
            .iter()
            .filter(|w| w.owner.as_ref() == Some(owner))
            .count()
    }
}

impl Drop for SagaRuntime {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::saga::{effect, WatchStrategy};
    use crate::testing::{settle, Latch};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_spec(
        action_type: &str,
        strategy: Option<WatchStrategy>,
        latch: Option<Latch>,
        done: &Arc<AtomicUsize>,
    ) -> SagaSpec {
        let done = Arc::clone(done);
        SagaSpec::new(
            action_type,
            strategy,
            effect(move |_ctx| {
                let done = Arc::clone(&done);
                let latch = latch.clone();
                async move {
                    if let Some(latch) = latch {
                        latch.wait().await;
                    }
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        )
    }

    #[tokio::test]
    async fn run_once_starts_immediately() {
        let rt = SagaRuntime::new();
        let done = Arc::new(AtomicUsize::new(0));
        rt.spawn(counting_spec("boot", None, None, &done), None, WeakStore::detached())
            .unwrap();

        assert_eq!(rt.deliver(&Action::new("boot")), 0);
        settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deliver_matches_exact_type() {
        let rt = SagaRuntime::new();
        let done = Arc::new(AtomicUsize::new(0));
        rt.spawn(
            counting_spec("ping", Some(WatchStrategy::TakeEvery), None, &done),
            None,
            WeakStore::detached(),
        )
        .unwrap();

        assert_eq!(rt.deliver(&Action::new("ping")), 1);
        assert_eq!(rt.deliver(&Action::new("ping/extra")), 0);
        assert_eq!(rt.deliver(&Action::new("ping")), 1);
        settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn take_every_runs_concurrently() {
        let rt = SagaRuntime::new();
        let latch = Latch::new();
        let done = Arc::new(AtomicUsize::new(0));
        rt.spawn(
            counting_spec("job", Some(WatchStrategy::TakeEvery), Some(latch.clone()), &done),
            None,
            WeakStore::detached(),
        )
        .unwrap();

        for _ in 0..3 {
            rt.deliver(&Action::new("job"));
        }
        settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 0);

        latch.open();
        settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn take_latest_cancels_previous() {
        let rt = SagaRuntime::new();
        let latch = Latch::new();
        let done = Arc::new(AtomicUsize::new(0));
        rt.spawn(
            counting_spec("search", Some(WatchStrategy::TakeLatest), Some(latch.clone()), &done),
            None,
            WeakStore::detached(),
        )
        .unwrap();

        rt.deliver(&Action::new("search"));
        settle().await;
        rt.deliver(&Action::new("search"));
        settle().await;

        latch.open();
        settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn take_leading_drops_while_busy() {
        let rt = SagaRuntime::new();
        let latch = Latch::new();
        let done = Arc::new(AtomicUsize::new(0));
        rt.spawn(
            counting_spec("save", Some(WatchStrategy::TakeLeading), Some(latch.clone()), &done),
            None,
            WeakStore::detached(),
        )
        .unwrap();

        rt.deliver(&Action::new("save"));
        settle().await;
        rt.deliver(&Action::new("save"));
        settle().await;

        latch.open();
        settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);

        // Idle again: next action starts a new execution.
        rt.deliver(&Action::new("save"));
        settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_runs_once_after_quiet_period() {
        let rt = SagaRuntime::new();
        let done = Arc::new(AtomicUsize::new(0));
        let delay = Duration::from_millis(100);
        rt.spawn(
            counting_spec("type", Some(WatchStrategy::Debounce(delay)), None, &done),
            None,
            WeakStore::detached(),
        )
        .unwrap();

        for _ in 0..3 {
            rt.deliver(&Action::new("type"));
            settle().await;
            tokio::time::advance(Duration::from_millis(60)).await;
        }
        settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_millis(60)).await;
        settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_owner_aborts_in_flight() {
        let rt = SagaRuntime::new();
        let latch = Latch::new();
        let done = Arc::new(AtomicUsize::new(0));
        let owner = ControllerId::new("uploader");
        rt.spawn(
            counting_spec("upload", Some(WatchStrategy::TakeEvery), Some(latch.clone()), &done),
            Some(owner.clone()),
            WeakStore::detached(),
        )
        .unwrap();
        rt.spawn(
            counting_spec("other", Some(WatchStrategy::TakeEvery), None, &done),
            None,
            WeakStore::detached(),
        )
        .unwrap();

        rt.deliver(&Action::new("upload"));
        settle().await;
        assert_eq!(rt.owned_by(&owner), 1);

        assert_eq!(rt.cancel_owner(&owner), 1);
        assert_eq!(rt.cancel_owner(&owner), 0);
        settle().await;

        latch.open();
        settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 0);
        assert_eq!(rt.active(), 1);
        assert_eq!(rt.deliver(&Action::new("upload")), 0);
    }

    #[test]
    fn spawn_outside_runtime_fails() {
        let rt = SagaRuntime::new();
        let done = Arc::new(AtomicUsize::new(0));
        let err = rt
            .spawn(counting_spec("x", None, None, &done), None, WeakStore::detached())
            .unwrap_err();
        assert!(matches!(err, StoreError::NoRuntime));
    }
}
