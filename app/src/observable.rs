// ==============================================================================
// observable.rs - Observable State Container
// ==============================================================================
// Description: get/set/subscribe cell with synchronous change notification
// Author: Matt Barham
// Created: 2026-10-05
// Modified: 2026-10-05
// Version: 1.0.0
// ==============================================================================
// One container per piece of session state, owned by the session that needs
// it. Listeners run inside `set`, on the caller's thread, after the lock is
// released so a listener may read the container again.
// ==============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by `subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Shared<T> {
    value: Mutex<T>,
    listeners: Mutex<Vec<(SubscriptionId, Listener<T>)>>,
    next_id: AtomicU64,
}

/// Cheaply cloneable handle; clones observe the same value
pub struct Observable<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*lock(&self.shared.value))
            .finish()
    }
}

impl<T: Default + Clone + Send + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

// A panicking listener must not wedge the session
fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Clone + Send + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                value: Mutex::new(value),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Snapshot of the current value
    pub fn get(&self) -> T {
        lock(&self.shared.value).clone()
    }

    /// Read without cloning
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&lock(&self.shared.value))
    }

    /// Replace the value and notify every listener
    pub fn set(&self, value: T) {
        let snapshot = {
            let mut guard = lock(&self.shared.value);
            *guard = value;
            guard.clone()
        };
        self.notify(&snapshot);
    }

    /// Mutate in place and notify
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let (result, snapshot) = {
            let mut guard = lock(&self.shared.value);
            let result = f(&mut guard);
            (result, guard.clone())
        };
        self.notify(&snapshot);
        result
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.shared.listeners).push((id, Arc::new(listener)));
        id
    }

    /// Returns false when the id was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = lock(&self.shared.listeners);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    fn notify(&self, value: &T) {
        let listeners: Vec<Listener<T>> = lock(&self.shared.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(value);
        }
    }
}
