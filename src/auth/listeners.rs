//! Auth-change listener registry.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Callbacks fired on login/logout, in registration order.
///
/// Membership is by registration: the same closure registered twice is two
/// entries, and each [`Subscription`] removes only its own.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Callback)>>,
}

impl ListenerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().push((id, Arc::new(callback)));
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Invoke every listener once, synchronously.
    ///
    /// The lock is released before callbacks run so a listener may register
    /// or unsubscribe without deadlocking; such changes apply from the next
    /// notification.
    pub fn notify(&self) {
        let callbacks: Vec<Callback> = self
            .entries
            .lock()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in callbacks {
            callback();
        }
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Handle returned by registration. Dropping it keeps the listener.
pub struct Subscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    /// Remove this registration. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove(self.id),
            None => false,
        }
    }
}
