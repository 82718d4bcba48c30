//! Integration tests for controller-owned sagas.
//!
//! Each watcher strategy is driven through a real store. Saga bodies park
//! on a [`Latch`] so a test can hold an execution in flight, then release
//! it after cancelling or re-triggering.

use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use strata_runtime::testing::{settle, Latch};
use strata_runtime::{
    Controller, ControllerContext, ControllerError, ControllerRegistry, RegistryError, SagaError,
    SagaTrigger, Store, WatchStrategy,
};
use strata_types::Action;

// =============================================================================
// Test Fixtures
// =============================================================================

/// Observation point for one saga. Each controller type below owns its
/// own probe and is used by a single test.
#[derive(Default)]
struct Probe {
    latch: Latch,
    started: AtomicUsize,
    finished: AtomicUsize,
    last_payload: parking_lot::Mutex<Value>,
}

impl Probe {
    fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

/// Registers a saga on `action` whose body records its payload, waits
/// for the probe's latch, then marks completion.
fn parked_saga(
    ctx: &mut ControllerContext,
    action: &str,
    strategy: WatchStrategy,
    probe: &'static Probe,
) -> Result<SagaTrigger, ControllerError> {
    ctx.create_saga()
        .with_addressable_name(action)
        .with_take(strategy)
        .register(move |saga| {
            probe.started.fetch_add(1, Ordering::SeqCst);
            *probe.last_payload.lock() = saga.payload().clone();
            async move {
                probe.latch.wait().await;
                probe.finished.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
}

macro_rules! saga_controller {
    ($name:ident, $probe:ident, $action:literal, $strategy:expr) => {
        static $probe: OnceLock<Probe> = OnceLock::new();

        struct $name;

        impl Controller for $name {
            fn build(ctx: &mut ControllerContext) -> Result<Self, ControllerError> {
                parked_saga(ctx, $action, $strategy, $probe.get_or_init(Probe::default))?;
                Ok(Self)
            }
        }
    };
}

saga_controller!(Search, SEARCH, "search/query", WatchStrategy::TakeLatest);
saga_controller!(Uploader, UPLOADER, "upload/start", WatchStrategy::TakeEvery);
saga_controller!(Refresher, REFRESHER, "feed/refresh", WatchStrategy::TakeLeading);
saga_controller!(
    Autosave,
    AUTOSAVE,
    "doc/edit",
    WatchStrategy::Debounce(Duration::from_millis(100))
);

fn probe(cell: &'static OnceLock<Probe>) -> &'static Probe {
    cell.get_or_init(Probe::default)
}

fn store_with<C: Controller>() -> Store {
    let registry = ControllerRegistry::new();
    registry.register::<C>().unwrap();
    Store::new(Arc::new(registry))
}

// =============================================================================
// Strategies
// =============================================================================

#[tokio::test]
async fn take_latest_cancels_prior_run() {
    let store = store_with::<Search>();
    let probe = probe(&SEARCH);

    store
        .dispatch(Action::with_payload("search/query", json!("ru")))
        .await
        .unwrap();
    store
        .dispatch(Action::with_payload("search/query", json!("rust")))
        .await
        .unwrap();
    settle().await;
    assert_eq!(probe.started(), 2);

    probe.latch.open();
    settle().await;
    assert_eq!(probe.finished(), 1);
    assert_eq!(*probe.last_payload.lock(), json!("rust"));
}

#[tokio::test]
async fn removal_cancels_in_flight_sagas() {
    let store = store_with::<Uploader>();
    let probe = probe(&UPLOADER);

    store.dispatch(Action::new("upload/start")).await.unwrap();
    settle().await;
    assert_eq!(probe.started(), 1);
    assert_eq!(store.active_sagas(), 1);

    assert!(Uploader::remove_instance(&store));
    settle().await;
    assert_eq!(store.active_sagas(), 0);

    probe.latch.open();
    settle().await;
    assert_eq!(probe.finished(), 0);
}

#[tokio::test]
async fn take_leading_drops_while_busy() {
    let store = store_with::<Refresher>();
    let probe = probe(&REFRESHER);

    for _ in 0..3 {
        store.dispatch(Action::new("feed/refresh")).await.unwrap();
    }
    settle().await;
    assert_eq!(probe.started(), 1);

    probe.latch.open();
    settle().await;
    assert_eq!(probe.finished(), 1);

    store.dispatch(Action::new("feed/refresh")).await.unwrap();
    settle().await;
    assert_eq!(probe.started(), 2);
    assert_eq!(probe.finished(), 2);
}

#[tokio::test(start_paused = true)]
async fn debounce_runs_once_after_quiet_period() {
    let store = store_with::<Autosave>();
    let probe = probe(&AUTOSAVE);
    probe.latch.open();

    for rev in 1..=3 {
        store
            .dispatch(Action::with_payload("doc/edit", json!(rev)))
            .await
            .unwrap();
        settle().await;
        tokio::time::advance(Duration::from_millis(50)).await;
    }
    settle().await;
    assert_eq!(probe.started(), 0);

    tokio::time::advance(Duration::from_millis(60)).await;
    settle().await;
    assert_eq!(probe.started(), 1);
    assert_eq!(probe.finished(), 1);
    assert_eq!(*probe.last_payload.lock(), json!(3));
}

// =============================================================================
// Run-once sagas and put
// =============================================================================

static BOOTS: AtomicUsize = AtomicUsize::new(0);

struct Bootstrap {
    trigger: SagaTrigger,
}

impl Controller for Bootstrap {
    fn build(ctx: &mut ControllerContext) -> Result<Self, ControllerError> {
        let trigger = ctx.create_saga().register(|saga| async move {
            if saga.store().is_some() {
                BOOTS.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        })?;
        Ok(Self { trigger })
    }
}

#[tokio::test]
async fn unconfigured_saga_runs_once_at_construction() {
    let store = Store::new(Arc::new(ControllerRegistry::new()));
    let boot = Bootstrap::get_instance(&store).unwrap().unwrap();
    settle().await;
    assert_eq!(BOOTS.load(Ordering::SeqCst), 1);

    // No watcher: the trigger does not re-enter the process.
    boot.trigger.dispatch(Value::Null).await.unwrap();
    settle().await;
    assert_eq!(BOOTS.load(Ordering::SeqCst), 1);
    assert!(boot.trigger.action_type().starts_with("@@strata/Bootstrap/"));
}

struct Pinger;

impl Controller for Pinger {
    fn build(ctx: &mut ControllerContext) -> Result<Self, ControllerError> {
        ctx.create_saga()
            .with_addressable_name("net/ping")
            .with_take(WatchStrategy::TakeEvery)
            .register(|saga| async move {
                let payload = saga.payload().clone();
                saga.put(Action::with_payload("net/pong", payload)).await?;
                Ok::<(), SagaError>(())
            })?;
        Ok(Self)
    }
}

struct Ponger;

impl Controller for Ponger {
    fn build(ctx: &mut ControllerContext) -> Result<Self, ControllerError> {
        ctx.state(json!([]))?;
        ctx.register_action(|state: &Value, payload: &Value| {
            let mut seen = state.as_array().cloned().unwrap_or_default();
            seen.push(payload.clone());
            Ok(Value::Array(seen))
        })
        .with_addressable_name("net/pong")?;
        Ok(Self)
    }
}

#[tokio::test]
async fn saga_put_lazily_loads_downstream_controller() {
    let registry = ControllerRegistry::new();
    registry.register::<Pinger>().unwrap();
    registry.register::<Ponger>().unwrap();
    let store = Store::new(Arc::new(registry));

    store
        .dispatch(Action::with_payload("net/ping", json!(1)))
        .await
        .unwrap();
    settle().await;

    assert!(store.is_live::<Pinger>());
    assert!(store.is_live::<Ponger>());
    assert_eq!(store.state()["Ponger"], json!([1]));
}

// =============================================================================
// Configuration errors
// =============================================================================

struct Misconfigured;

impl Controller for Misconfigured {
    fn build(ctx: &mut ControllerContext) -> Result<Self, ControllerError> {
        ctx.create_saga()
            .with_take_named("take_sometimes")
            .register(|_saga| async { Ok(()) })?;
        Ok(Self)
    }
}

#[derive(Debug)]
struct DoubleBooked;

impl Controller for DoubleBooked {
    fn build(ctx: &mut ControllerContext) -> Result<Self, ControllerError> {
        for _ in 0..2 {
            ctx.create_saga()
                .with_addressable_name("jobs/run")
                .with_take(WatchStrategy::TakeEvery)
                .register(|_saga| async { Ok(()) })?;
        }
        Ok(Self)
    }
}

#[test]
fn unknown_strategy_fails_at_registration() {
    let err = ControllerRegistry::new()
        .register::<Misconfigured>()
        .unwrap_err();

    assert!(err.to_string().contains("take_sometimes"));
    assert!(matches!(
        err,
        RegistryError::Declaration {
            source: ControllerError::Saga(SagaError::UnknownStrategy(_)),
            ..
        }
    ));
}

#[tokio::test]
async fn duplicate_saga_action_is_rejected() {
    let store = Store::new(Arc::new(ControllerRegistry::new()));
    let err = DoubleBooked::get_instance(&store).unwrap_err();

    assert!(matches!(err, ControllerError::DuplicateSagaAction { ref action, .. } if action == "jobs/run"));
    assert!(!store.is_live::<DoubleBooked>());
    assert_eq!(store.active_sagas(), 0);
}
