//! Integration tests for stores built from a loaded configuration.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strata_hook::testing::MockHook;
use strata_runtime::config::{ConfigLoader, StrataConfig};
use strata_runtime::testing::settle;
use strata_runtime::{
    Controller, ControllerContext, ControllerError, ControllerRegistry, DispatchError, HookPoint,
    Store,
};
use strata_types::Action;
use tempfile::TempDir;

fn load(toml: &str) -> StrataConfig {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("strata.toml");
    std::fs::write(&path, toml).unwrap();
    ConfigLoader::new()
        .with_file(&path)
        .skip_env_vars()
        .load()
        .unwrap()
}

static SAVES: AtomicUsize = AtomicUsize::new(0);

/// Uses the store's configured default debounce.
struct Drafts;

impl Controller for Drafts {
    fn build(ctx: &mut ControllerContext) -> Result<Self, ControllerError> {
        ctx.create_saga()
            .with_addressable_name("drafts/changed")
            .with_take_named("debounce")
            .register(|_saga| async {
                SAVES.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })?;
        Ok(Self)
    }
}

#[tokio::test(start_paused = true)]
async fn named_debounce_uses_configured_default() {
    let config = load("[saga]\ndefault_debounce_ms = 40\n");
    let registry = ControllerRegistry::new();
    registry.register::<Drafts>().unwrap();
    let store = Store::builder(Arc::new(registry))
        .with_config(config)
        .build()
        .unwrap();

    store.dispatch(Action::new("drafts/changed")).await.unwrap();
    settle().await;
    tokio::time::advance(Duration::from_millis(30)).await;
    settle().await;
    assert_eq!(SAVES.load(Ordering::SeqCst), 0);

    tokio::time::advance(Duration::from_millis(20)).await;
    settle().await;
    assert_eq!(SAVES.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn deferred_dispatch_times_out() {
    let config = load("[dispatch]\ndefer_timeout_ms = 250\n");
    assert_eq!(config.dispatch.defer_timeout(), Some(Duration::from_millis(250)));

    let store = Store::builder(Arc::new(ControllerRegistry::new()))
        .with_config(config)
        .with_hook(MockHook::deferrer("stuck", "*", HookPoint::PreDispatch, |_| {
            Box::pin(std::future::pending())
        }))
        .build()
        .unwrap();

    let err = store.dispatch(Action::new("anything")).await.unwrap_err();
    assert!(matches!(err, DispatchError::DeferTimeout { after_ms: 250, .. }));
    assert!(strata_types::ErrorCode::is_recoverable(&err));

    // The gate was released: later dispatches still run (and time out).
    assert!(store.dispatch(Action::new("again")).await.is_err());
}

#[test]
fn missing_file_keeps_defaults() {
    let dir = TempDir::new().unwrap();
    let config = ConfigLoader::new()
        .with_file(dir.path().join("absent.toml"))
        .skip_env_vars()
        .load()
        .unwrap();
    assert_eq!(config, StrataConfig::default());
}
