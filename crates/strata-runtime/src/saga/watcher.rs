//! Watcher loops run on tokio, one task per registered saga.

use super::{Effect, SagaContext, WatchStrategy};
use crate::store::WeakStore;
use std::sync::Arc;
use strata_types::Action;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

async fn execute(saga: Arc<str>, effect: Effect, ctx: SagaContext) {
    if let Err(e) = effect(ctx).await {
        warn!(saga = %saga, error = %e, "saga effect failed");
    }
}

/// Runs the effect once with no triggering action.
pub(super) async fn run_once(saga: Arc<str>, effect: Effect, store: WeakStore) {
    debug!(saga = %saga, "saga started (run once)");
    execute(saga, effect, SagaContext::new(store, None)).await;
}

/// Consumes matching actions and applies `strategy`.
///
/// In-flight executions live in a local `JoinSet`: aborting the watcher
/// task drops the set, which aborts them too.
pub(super) async fn watch(
    saga: Arc<str>,
    strategy: WatchStrategy,
    effect: Effect,
    store: WeakStore,
    mut rx: UnboundedReceiver<Action>,
) {
    debug!(saga = %saga, strategy = %strategy, "saga watcher started");
    let mut running: JoinSet<()> = JoinSet::new();
    let mut debounced: Option<(Instant, Action)> = None;

    let start = |running: &mut JoinSet<()>, action: Action| {
        let ctx = SagaContext::new(store.clone(), Some(action));
        running.spawn(execute(Arc::clone(&saga), Arc::clone(&effect), ctx));
    };

    loop {
        let deadline = debounced.as_ref().map_or_else(Instant::now, |(at, _)| *at);

        tokio::select! {
            // Reap completions before looking at new actions so that
            // take_leading sees an accurate in-flight set.
            biased;

            Some(joined) = running.join_next(), if !running.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        warn!(saga = %saga, "saga execution panicked");
                    }
                }
            }

            () = sleep_until(deadline), if debounced.is_some() => {
                if let Some((_, action)) = debounced.take() {
                    start(&mut running, action);
                }
            }

            received = rx.recv() => {
                let Some(action) = received else { break };
                match strategy {
                    WatchStrategy::TakeEvery => start(&mut running, action),
                    WatchStrategy::TakeLatest => {
                        if !running.is_empty() {
                            debug!(saga = %saga, "cancelling in-flight execution");
                            running.abort_all();
                        }
                        start(&mut running, action);
                    }
                    WatchStrategy::TakeLeading => {
                        if running.is_empty() {
                            start(&mut running, action);
                        } else {
                            debug!(saga = %saga, "busy, dropping action");
                        }
                    }
                    WatchStrategy::Debounce(delay) => {
                        debounced = Some((Instant::now() + delay, action));
                    }
                }
            }
        }
    }

    while running.join_next().await.is_some() {}
    debug!(saga = %saga, "saga watcher stopped");
}
