// Observer registries for collection change notification.
//
// A channel holds a set of callbacks. `notify` hands every callback the
// full snapshot, synchronously, in registration order. Callbacks are
// cloned out of the registry before being invoked so an observer may
// subscribe or unsubscribe from inside its own callback.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::debug;

/// Shared observer callback.
pub type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    observers: Vec<(u64, Observer<T>)>,
}

impl<T> Registry<T> {
    fn new() -> Self {
        Self {
            next_id: 0,
            observers: Vec::new(),
        }
    }

    fn add(&mut self, observer: Observer<T>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    fn remove(&mut self, id: u64) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    fn snapshot(&self) -> Vec<Observer<T>> {
        self.observers.iter().map(|(_, o)| Arc::clone(o)).collect()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().expect("observer registry mutex poisoned")
}

// ---------------------------------------------------------------------------
// Subscription handle
// ---------------------------------------------------------------------------

/// Handle returned by every subscribe call. Dropping it (or calling
/// [`Subscription::unsubscribe`]) deregisters the observer. Other
/// observers on the same channel are unaffected.
#[must_use = "dropping a Subscription immediately unsubscribes the observer"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop delivering notifications to this observer.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Keep the observer registered for the lifetime of its channel.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A single notification channel (one per collection).
pub struct Channel<T> {
    name: &'static str,
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T: 'static> Channel<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            registry: Arc::new(Mutex::new(Registry::new())),
        }
    }

    /// Register an observer. It is not invoked here; replay is the
    /// caller's job since only the caller knows the current snapshot.
    pub fn register(&self, observer: Observer<T>) -> Subscription {
        let id = lock(&self.registry).add(observer);
        let weak: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        let name = self.name;
        Subscription::new(move || {
            if let Some(registry) = weak.upgrade() {
                if lock(&registry).remove(id) {
                    debug!(channel = name, id, "observer removed");
                }
            }
        })
    }

    /// Deliver `snapshot` to every registered observer. Returns the number
    /// of observers notified.
    pub fn notify(&self, snapshot: &T) -> usize {
        let observers = lock(&self.registry).snapshot();
        debug!(channel = self.name, observers = observers.len(), "notifying");
        for observer in &observers {
            observer(snapshot);
        }
        observers.len()
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.registry).observers.len()
    }
}

// ---------------------------------------------------------------------------
// KeyedChannels
// ---------------------------------------------------------------------------

/// Channels addressed by a string key (one per user). A key's entry is
/// dropped once its last observer leaves.
pub struct KeyedChannels<T> {
    name: &'static str,
    registries: Arc<Mutex<HashMap<String, Registry<T>>>>,
}

impl<T: 'static> KeyedChannels<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            registries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn register(&self, key: &str, observer: Observer<T>) -> Subscription {
        let id = lock(&self.registries)
            .entry(key.to_string())
            .or_insert_with(Registry::new)
            .add(observer);

        let weak = Arc::downgrade(&self.registries);
        let key = key.to_string();
        let name = self.name;
        Subscription::new(move || {
            let Some(registries) = weak.upgrade() else {
                return;
            };
            let mut map = lock(&registries);
            if let Some(registry) = map.get_mut(&key) {
                registry.remove(id);
                if registry.observers.is_empty() {
                    map.remove(&key);
                }
                debug!(channel = name, key = %key, id, "observer removed");
            }
        })
    }

    /// Deliver `snapshot` to the observers of `key` only.
    pub fn notify(&self, key: &str, snapshot: &T) -> usize {
        let observers = match lock(&self.registries).get(key) {
            Some(registry) => registry.snapshot(),
            None => return 0,
        };
        debug!(channel = self.name, key, observers = observers.len(), "notifying");
        for observer in &observers {
            observer(snapshot);
        }
        observers.len()
    }

    pub fn observer_count(&self, key: &str) -> usize {
        lock(&self.registries)
            .get(key)
            .map_or(0, |r| r.observers.len())
    }

    /// Number of keys that currently have at least one observer.
    pub fn key_count(&self) -> usize {
        lock(&self.registries).len()
    }
}
