//! The orchestrated store.
//!
//! # Dispatch
//!
//! ```text
//! dispatch(action)
//!   │  acquire FIFO gate (one dispatch at a time, in call order)
//!   ├─ 1. pre-dispatch hooks ── Abort ─────────────► Err(Aborted)
//!   │        └─ Defer: await pendings (sole suspension point)
//!   ├─ 2. lazy load: registry.controller_for_action(type, !live here)
//!   │        └─ build + commit reducer / sagas / hooks, repeated until
//!   │           no registered controller declaring `type` is missing
//!   ├─ 3. reduce (all-or-nothing) ── slice error ──► Err(Reducer)
//!   ├─ 4. notify listeners (once; slices loaded in 2 are not
//!   │     announced separately)
//!   ├─ 5. deliver to saga watchers
//!   ├─ 6. post-dispatch hooks (run on a snapshot of the chain)
//!   └─ 7. Ok(action)
//! ```
//!
//! A controller loaded in step 2 has its reducer and watchers in place
//! before step 3, so the triggering action reaches it in the same dispatch.
//!
//! # Ownership
//!
//! The store owns its controller instances. Handles given to controllers
//! and sagas hold a [`WeakStore`], so no reference cycle keeps a dropped
//! store alive.

use crate::config::StrataConfig;
use crate::controller::{Controller, ControllerContext};
use crate::registry::{ControllerRegistry, StoreBinding};
use crate::saga::{SagaRuntime, SagaSpec};
use crate::state::{
    Listener, ListenerSet, ReducerInjector, SliceReducer, StateContainer, Subscription, INIT_ACTION,
};
use crate::{ControllerError, DispatchError, StoreError};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde_json::Value;
use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use strata_hook::{DispatchHook, HookPoint, HookRegistry, HookVerdict, Pending};
use strata_types::{Action, ControllerId, SliceKey, StoreId};
use tracing::{debug, info, warn};

struct LiveController {
    identity: ControllerId,
    type_name: &'static str,
    instance: Arc<dyn Any + Send + Sync>,
    has_slice: bool,
}

struct StoreInner {
    id: StoreId,
    config: StrataConfig,
    registry: Arc<ControllerRegistry>,
    /// FIFO: tokio's mutex grants the lock in request order.
    gate: tokio::sync::Mutex<()>,
    /// Lock order: `injector` before `container`.
    injector: Mutex<ReducerInjector>,
    container: Mutex<StateContainer>,
    listeners: Arc<ListenerSet>,
    sagas: SagaRuntime,
    hooks: Arc<RwLock<HookRegistry>>,
    instances: RwLock<HashMap<TypeId, LiveController>>,
    /// Serializes construction; holds the types currently being built.
    construction: ReentrantMutex<RefCell<HashSet<TypeId>>>,
    /// Set while `dispatch` lazily loads; reducer changes skip listeners
    /// until the triggering action is reduced.
    loading: AtomicBool,
    /// A reducer change was held back during the current lazy load.
    held_back: AtomicBool,
    destroyed: AtomicBool,
}

/// A state store that lazily instantiates controllers.
///
/// Cheap to clone; clones share the same store.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use serde_json::json;
/// use strata_runtime::{ControllerRegistry, Store};
/// use strata_types::Action;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = Store::new(Arc::new(ControllerRegistry::new()));
/// let action = store.dispatch(Action::new("ping")).await.unwrap();
/// assert_eq!(action.action_type(), "ping");
/// assert_eq!(store.state(), json!({}));
/// # }
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

/// Non-owning reference to a [`Store`].
///
/// A detached `WeakStore` (from a declaration dry run) never upgrades.
#[derive(Clone, Default)]
pub struct WeakStore {
    inner: Option<Weak<StoreInner>>,
}

impl WeakStore {
    /// A reference bound to no store.
    #[must_use]
    pub fn detached() -> Self {
        Self::default()
    }

    /// Returns `true` if this reference was never bound to a store.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.inner.is_none()
    }

    /// The store, if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Store> {
        self.inner
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Store { inner })
    }

    /// Dispatches through the referenced store.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Detached`] for a detached reference,
    /// [`DispatchError::Destroyed`] if the store was dropped, otherwise
    /// whatever [`Store::dispatch`] returns.
    pub async fn dispatch(&self, action: Action) -> Result<Action, DispatchError> {
        let Some(weak) = &self.inner else {
            return Err(DispatchError::Detached);
        };
        let store = weak
            .upgrade()
            .map(|inner| Store { inner })
            .ok_or(DispatchError::Destroyed)?;
        store.dispatch(action).await
    }
}

impl fmt::Debug for WeakStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(store) => write!(f, "WeakStore({})", store.id()),
            None if self.is_detached() => f.write_str("WeakStore(detached)"),
            None => f.write_str("WeakStore(dropped)"),
        }
    }
}

/// Builder for [`Store`].
pub struct StoreBuilder {
    registry: Arc<ControllerRegistry>,
    config: StrataConfig,
    hooks: Vec<Box<dyn DispatchHook>>,
}

impl StoreBuilder {
    /// Uses `config` instead of the defaults.
    #[must_use]
    pub fn with_config(mut self, config: StrataConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a store-level dispatch hook.
    #[must_use]
    pub fn with_hook(mut self, hook: impl DispatchHook + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Builds the store.
    ///
    /// # Errors
    ///
    /// [`StoreError::Hook`] if two hooks share an ID.
    pub fn build(self) -> Result<Store, StoreError> {
        let mut hooks = HookRegistry::new();
        for hook in self.hooks {
            hooks.register(hook)?;
        }
        Ok(Store::assemble(self.registry, self.config, hooks))
    }
}

impl Store {
    /// Starts building a store backed by `registry`.
    #[must_use]
    pub fn builder(registry: Arc<ControllerRegistry>) -> StoreBuilder {
        StoreBuilder {
            registry,
            config: StrataConfig::default(),
            hooks: Vec::new(),
        }
    }

    /// Creates a store with default configuration and no hooks.
    #[must_use]
    pub fn new(registry: Arc<ControllerRegistry>) -> Self {
        Self::assemble(registry, StrataConfig::default(), HookRegistry::new())
    }

    fn assemble(
        registry: Arc<ControllerRegistry>,
        config: StrataConfig,
        hooks: HookRegistry,
    ) -> Self {
        let mut container = StateContainer::new();
        // No slices yet: INIT cannot fail.
        let _ = container.apply(&Action::new(INIT_ACTION));

        let store = Self {
            inner: Arc::new(StoreInner {
                id: StoreId::new(),
                config,
                registry,
                gate: tokio::sync::Mutex::new(()),
                injector: Mutex::new(ReducerInjector::new()),
                container: Mutex::new(container),
                listeners: Arc::new(ListenerSet::default()),
                sagas: SagaRuntime::new(),
                hooks: Arc::new(RwLock::new(hooks)),
                instances: RwLock::new(HashMap::new()),
                construction: ReentrantMutex::new(RefCell::new(HashSet::new())),
                loading: AtomicBool::new(false),
                held_back: AtomicBool::new(false),
                destroyed: AtomicBool::new(false),
            }),
        };
        info!(store = %store.id(), hooks = store.inner.hooks.read().len(), "store created");
        store
    }

    /// Store identifier, for logs.
    #[must_use]
    pub fn id(&self) -> StoreId {
        self.inner.id
    }

    /// Effective configuration.
    #[must_use]
    pub fn config(&self) -> &StrataConfig {
        &self.inner.config
    }

    /// The registry this store lazily loads from.
    #[must_use]
    pub fn registry(&self) -> &Arc<ControllerRegistry> {
        &self.inner.registry
    }

    /// Non-owning reference to this store.
    #[must_use]
    pub fn downgrade(&self) -> WeakStore {
        WeakStore {
            inner: Some(Arc::downgrade(&self.inner)),
        }
    }

    /// Returns `true` if both handles refer to the same store.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Returns `true` after [`destroy`](Self::destroy).
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    // ── State ────────────────────────────────────────────────

    /// Snapshot of the committed state.
    #[must_use]
    pub fn state(&self) -> Value {
        self.inner.container.lock().state().clone()
    }

    /// Snapshot of one slice, `None` if it is not in the state.
    #[must_use]
    pub fn slice(&self, key: &SliceKey) -> Option<Value> {
        key.lookup(self.inner.container.lock().state()).cloned()
    }

    /// Calls `listener` with the committed state after every change.
    pub fn subscribe(&self, listener: impl Fn(&Value) + Send + Sync + 'static) -> Subscription {
        let listener: Listener = Arc::new(listener);
        self.inner.listeners.add(listener)
    }

    /// The shared hook registry. Hooks may be added or toggled at runtime.
    #[must_use]
    pub fn hooks(&self) -> Arc<RwLock<HookRegistry>> {
        Arc::clone(&self.inner.hooks)
    }

    /// Number of saga tasks still running.
    #[must_use]
    pub fn active_sagas(&self) -> usize {
        self.inner.sagas.active()
    }

    // ── Dispatch ─────────────────────────────────────────────

    /// Dispatches `action` and returns it unchanged.
    ///
    /// Concurrent callers are served strictly in call order.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::Aborted`] / [`DispatchError::DeferTimeout`] from
    ///   pre-dispatch hooks; nothing was reduced or delivered.
    /// - [`DispatchError::Controller`] if lazily loading a controller failed.
    /// - [`DispatchError::Reducer`] if a slice reducer failed; the state
    ///   is unchanged.
    /// - [`DispatchError::Destroyed`] after [`destroy`](Self::destroy).
    pub async fn dispatch(&self, action: Action) -> Result<Action, DispatchError> {
        let _gate = self.inner.gate.lock().await;
        if self.is_destroyed() {
            return Err(DispatchError::Destroyed);
        }

        let pre = self.inner.hooks.read().chain(HookPoint::PreDispatch);
        match pre.run(&action) {
            HookVerdict::Proceed => {}
            HookVerdict::Deferred(pending) => {
                self.await_deferred(pending, &action).await?;
                if self.is_destroyed() {
                    return Err(DispatchError::Destroyed);
                }
            }
            HookVerdict::Aborted { hook_id, reason } => {
                debug!(store = %self.id(), action = %action, hook = %hook_id, "dispatch aborted");
                return Err(DispatchError::Aborted { hook_id, reason });
            }
        }

        let held_back = self.load_lazily(&action)?;

        let applied = {
            let mut container = self.inner.container.lock();
            container.apply(&action).map(|()| container.state().clone())
        };
        match applied {
            Ok(snapshot) => self.inner.listeners.notify(&snapshot),
            Err(failure) => {
                if held_back {
                    self.notify_current();
                }
                return Err(failure.into());
            }
        }

        let watchers = self.inner.sagas.deliver(&action);
        debug!(store = %self.id(), action = %action, watchers, "action dispatched");

        let post = self.inner.hooks.read().chain(HookPoint::PostDispatch);
        let _ = post.run(&action);
        Ok(action)
    }

    async fn await_deferred(&self, pending: Vec<Pending>, action: &Action) -> Result<(), DispatchError> {
        debug!(store = %self.id(), action = %action, pending = pending.len(), "dispatch deferred");
        let all = async {
            for fut in pending {
                fut.await;
            }
        };
        match self.inner.config.dispatch.defer_timeout() {
            None => {
                all.await;
                Ok(())
            }
            Some(limit) => tokio::time::timeout(limit, all).await.map_err(|_| {
                warn!(store = %self.id(), action = %action, "deferred dispatch timed out");
                DispatchError::DeferTimeout {
                    action: action.action_type().to_string(),
                    after_ms: self.inner.config.dispatch.defer_timeout_ms,
                }
            }),
        }
    }

    /// Returns `true` if reducer changes were held back from listeners.
    fn load_lazily(&self, action: &Action) -> Result<bool, ControllerError> {
        if action.is_internal() {
            return Ok(false);
        }
        self.inner.held_back.store(false, Ordering::SeqCst);
        self.inner.loading.store(true, Ordering::SeqCst);
        let result = self.load_declaring(action);
        self.inner.loading.store(false, Ordering::SeqCst);
        let held_back = self.inner.held_back.swap(false, Ordering::SeqCst);
        if result.is_err() && held_back {
            // The dispatch stops here, so publish the slices that did load.
            self.notify_current();
        }
        result.map(|()| held_back)
    }

    fn load_declaring(&self, action: &Action) -> Result<(), ControllerError> {
        // Each materialized controller becomes live, so the next lookup
        // yields the next declaring controller in registration order.
        while let Some(desc) = self
            .inner
            .registry
            .controller_for_action(action.action_type(), |t| self.is_live_type(t))
        {
            debug!(
                store = %self.id(),
                controller = %desc.identity(),
                action = %action,
                "lazy-loading controller"
            );
            if !desc.materialize(self)? {
                break;
            }
        }
        Ok(())
    }

    fn notify_current(&self) {
        let snapshot = self.inner.container.lock().state().clone();
        self.inner.listeners.notify(&snapshot);
    }

    /// Reducer changes made by a lazy load are published by the dispatch
    /// that triggered it.
    fn notify_reducer_change(&self, snapshot: &Value) {
        if self.inner.loading.load(Ordering::SeqCst) {
            self.inner.held_back.store(true, Ordering::SeqCst);
        } else {
            self.inner.listeners.notify(snapshot);
        }
    }

    // ── Reducers & sagas ─────────────────────────────────────

    /// Injects a slice reducer and replaces the combined reducer.
    ///
    /// Previously injected slices are kept.
    ///
    /// # Errors
    ///
    /// - [`StoreError::DuplicateSlice`] / [`StoreError::SliceConflict`].
    /// - [`StoreError::Reducer`] if the replace action fails; nothing changes.
    /// - [`StoreError::Destroyed`] after [`destroy`](Self::destroy).
    pub fn register_reducer(&self, key: SliceKey, reducer: SliceReducer) -> Result<(), StoreError> {
        if self.is_destroyed() {
            return Err(StoreError::Destroyed);
        }
        let snapshot = {
            let mut injector = self.inner.injector.lock();
            let mut next = injector.clone();
            next.inject(key.clone(), reducer)?;
            let mut container = self.inner.container.lock();
            container.replace_reducer(next.combine())?;
            *injector = next;
            container.state().clone()
        };
        debug!(store = %self.id(), slice = %key, "reducer registered");
        self.notify_reducer_change(&snapshot);
        Ok(())
    }

    /// Ejects a slice reducer; its key disappears from the state.
    /// Returns `false` if nothing was injected under `key`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Reducer`] if the replace action fails; nothing changes.
    pub fn unregister_reducer(&self, key: &SliceKey) -> Result<bool, StoreError> {
        let snapshot = {
            let mut injector = self.inner.injector.lock();
            let mut next = injector.clone();
            if !next.eject(key) {
                return Ok(false);
            }
            let mut container = self.inner.container.lock();
            container.replace_reducer(next.combine())?;
            *injector = next;
            container.state().clone()
        };
        debug!(store = %self.id(), slice = %key, "reducer unregistered");
        self.notify_reducer_change(&snapshot);
        Ok(true)
    }

    /// Starts a saga, grouped under `owner` for later cancellation.
    ///
    /// # Errors
    ///
    /// [`StoreError::NoRuntime`] outside tokio, [`StoreError::Destroyed`]
    /// after [`destroy`](Self::destroy).
    pub fn register_saga(&self, saga: SagaSpec, owner: Option<ControllerId>) -> Result<(), StoreError> {
        if self.is_destroyed() {
            return Err(StoreError::Destroyed);
        }
        self.inner.sagas.spawn(saga, owner, self.downgrade())
    }

    // ── Controllers ──────────────────────────────────────────

    /// Returns the live `C`, constructing it on first use.
    ///
    /// Construction runs `C::build`, then commits its reducer, sagas and
    /// hooks. A controller may request other controllers from `build`.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::CyclicConstruction`] if `C` is requested while
    ///   it is being built.
    /// - [`ControllerError::IdentityInUse`] if another live type has
    ///   `C`'s identity.
    /// - Anything `build` or the commit returns.
    ///
    /// A destroyed store returns `Ok(None)`.
    pub fn get_controller<C: Controller>(&self) -> Result<Option<Arc<C>>, ControllerError> {
        if self.is_destroyed() {
            return Ok(None);
        }
        if let Some(found) = self.controller::<C>() {
            return Ok(Some(found));
        }

        let building = self.inner.construction.lock();
        // Another thread may have finished it while we waited.
        if let Some(found) = self.controller::<C>() {
            return Ok(Some(found));
        }

        let type_id = TypeId::of::<C>();
        if !building.borrow_mut().insert(type_id) {
            return Err(ControllerError::CyclicConstruction(C::identity()));
        }
        let result = self.construct::<C>();
        building.borrow_mut().remove(&type_id);
        result.map(Some)
    }

    fn construct<C: Controller>(&self) -> Result<Arc<C>, ControllerError> {
        let identity = C::identity();
        if let Some(live) = self
            .inner
            .instances
            .read()
            .values()
            .find(|l| l.identity == identity)
        {
            return Err(ControllerError::IdentityInUse {
                identity,
                existing: live.type_name,
            });
        }

        let mut ctx = ControllerContext::attached(identity.clone(), self);
        let controller = Arc::new(C::build(&mut ctx)?);
        let has_slice = ctx.commit(self)?;

        let instance: Arc<dyn Any + Send + Sync> = controller.clone();
        self.inner.instances.write().insert(
            TypeId::of::<C>(),
            LiveController {
                identity: identity.clone(),
                type_name: type_name::<C>(),
                instance,
                has_slice,
            },
        );
        info!(store = %self.id(), controller = %identity, "controller instantiated");
        Ok(controller)
    }

    /// The live `C`, without constructing it.
    #[must_use]
    pub fn controller<C: Controller>(&self) -> Option<Arc<C>> {
        let instance = self
            .inner
            .instances
            .read()
            .get(&TypeId::of::<C>())
            .map(|live| Arc::clone(&live.instance))?;
        instance.downcast::<C>().ok()
    }

    /// Returns `true` if `C` is instantiated on this store.
    #[must_use]
    pub fn is_live<C: Controller>(&self) -> bool {
        self.is_live_type(TypeId::of::<C>())
    }

    fn is_live_type(&self, type_id: TypeId) -> bool {
        self.inner.instances.read().contains_key(&type_id)
    }

    /// Number of live controllers.
    #[must_use]
    pub fn live_controllers(&self) -> usize {
        self.inner.instances.read().len()
    }

    /// Removes `C`: unregisters its reducer, cancels its sagas and drops
    /// its hooks. Returns `false` if `C` was not live.
    pub fn remove_controller<C: Controller>(&self) -> bool {
        let removed = self.inner.instances.write().remove(&TypeId::of::<C>());
        match removed {
            Some(live) => {
                self.teardown(&live);
                true
            }
            None => false,
        }
    }

    fn teardown(&self, live: &LiveController) {
        let sagas = self.inner.sagas.cancel_owner(&live.identity);
        let hooks = self.inner.hooks.write().unregister_by_owner(&live.identity);
        if live.has_slice {
            if let Err(e) = self.unregister_reducer(&live.identity.slice_key()) {
                warn!(store = %self.id(), controller = %live.identity, error = %e, "failed to unregister reducer");
            }
        }
        info!(store = %self.id(), controller = %live.identity, sagas, hooks, "controller removed");
    }

    /// Removes every controller, cancels all sagas and drops listeners.
    /// Later dispatches fail with [`DispatchError::Destroyed`].
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.listeners.clear();
        let live: Vec<LiveController> = self.inner.instances.write().drain().map(|(_, l)| l).collect();
        for controller in &live {
            self.teardown(controller);
        }
        let orphans = self.inner.sagas.cancel_all();
        info!(store = %self.id(), controllers = live.len(), orphans, "store destroyed");
    }
}

impl StoreBinding for Store {
    fn register_reducer(&self, key: SliceKey, reducer: SliceReducer) -> Result<(), StoreError> {
        Store::register_reducer(self, key, reducer)
    }

    fn unregister_reducer(&self, key: &SliceKey) -> Result<bool, StoreError> {
        Store::unregister_reducer(self, key)
    }

    fn register_saga(&self, saga: SagaSpec, owner: Option<ControllerId>) -> Result<(), StoreError> {
        Store::register_saga(self, saga, owner)
    }

    fn cancel_sagas(&self, owner: &ControllerId) -> usize {
        self.inner.sagas.cancel_owner(owner)
    }

    fn register_hook(&self, hook: Box<dyn DispatchHook>, owner: ControllerId) -> Result<(), StoreError> {
        self.inner.hooks.write().register_owned(hook, owner)?;
        Ok(())
    }

    fn unregister_hooks(&self, owner: &ControllerId) -> usize {
        self.inner.hooks.write().unregister_by_owner(owner)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.inner.id)
            .field("controllers", &self.live_controllers())
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}
