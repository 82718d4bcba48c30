//! Sagas: background effect processes triggered by dispatched actions.
//!
//! A saga is an async effect wrapped in a [`WatchStrategy`] that decides
//! how matching actions start (or cancel) executions. Each registered
//! saga becomes one watcher task on tokio:
//!
//! ```text
//!  Store::dispatch ──deliver()──► mpsc ──► watcher task ──spawn──► JoinSet
//!                                           │ take_latest: abort_all, spawn
//!                                           │ take_every:  spawn
//!                                           │ take_leading: spawn if idle
//!                                           │ debounce:    reset deadline
//!                                           ▼
//!                               cancel_owner(): abort watcher ⇒ JoinSet dropped
//! ```
//!
//! Without a strategy the effect runs once, right after registration.

mod context;
mod runtime;
mod strategy;
mod watcher;

pub use context::{SagaContext, SagaResult};
pub use runtime::SagaRuntime;
pub use strategy::WatchStrategy;

pub(crate) use strategy::DEFAULT_DEBOUNCE;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed effect future.
pub type EffectFuture = Pin<Box<dyn Future<Output = SagaResult> + Send + 'static>>;

/// Type-erased effect process.
pub type Effect = Arc<dyn Fn(SagaContext) -> EffectFuture + Send + Sync>;

/// Erases an async closure into an [`Effect`].
pub fn effect<F, Fut>(f: F) -> Effect
where
    F: Fn(SagaContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = SagaResult> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// A saga ready to be started: trigger action, strategy and effect.
#[derive(Clone)]
pub struct SagaSpec {
    /// Action type that triggers the effect.
    pub action_type: String,
    /// Watcher strategy; `None` runs the effect once at start.
    pub strategy: Option<WatchStrategy>,
    /// The effect process.
    pub effect: Effect,
}

impl SagaSpec {
    /// Declares a saga for `action_type`.
    pub fn new(
        action_type: impl Into<String>,
        strategy: Option<WatchStrategy>,
        effect: Effect,
    ) -> Self {
        Self {
            action_type: action_type.into(),
            strategy,
            effect,
        }
    }
}

impl fmt::Debug for SagaSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SagaSpec")
            .field("action_type", &self.action_type)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}
