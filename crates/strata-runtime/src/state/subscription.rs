//! State change listeners.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Called with the committed state after every state change.
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    listeners: BTreeMap<u64, Listener>,
}

/// Listener table shared between a store and its subscriptions.
#[derive(Default)]
pub(crate) struct ListenerSet {
    table: Mutex<ListenerTable>,
}

impl ListenerSet {
    pub(crate) fn add(self: &Arc<Self>, listener: Listener) -> Subscription {
        let mut table = self.table.lock();
        let id = table.next_id;
        table.next_id += 1;
        table.listeners.insert(id, listener);
        Subscription {
            id,
            set: Arc::downgrade(self),
            active: AtomicBool::new(true),
        }
    }

    fn remove(&self, id: u64) {
        self.table.lock().listeners.remove(&id);
    }

    /// Calls every listener in subscription order. The table lock is
    /// released first, so listeners may subscribe or unsubscribe.
    pub(crate) fn notify(&self, state: &Value) {
        let snapshot: Vec<Listener> = self.table.lock().listeners.values().cloned().collect();
        for listener in snapshot {
            listener(state);
        }
    }

    pub(crate) fn clear(&self) {
        self.table.lock().listeners.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.table.lock().listeners.len()
    }
}

/// Handle returned by [`Store::subscribe`](crate::Store::subscribe).
///
/// Dropping it does not unsubscribe; call [`unsubscribe`](Self::unsubscribe).
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    set: Weak<ListenerSet>,
    active: AtomicBool,
}

impl Subscription {
    /// Removes the listener. Only the first call has an effect; it
    /// returns `true`, later calls return `false`.
    pub fn unsubscribe(&self) -> bool {
        if !self.active.swap(false, Ordering::SeqCst) {
            return false;
        }
        if let Some(set) = self.set.upgrade() {
            set.remove(self.id);
        }
        true
    }

    /// Returns `true` until [`unsubscribe`](Self::unsubscribe) is called.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
