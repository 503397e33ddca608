//! Multi-subscriber event emitter.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::disposable::Disposable;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct EmitterInner<T> {
    listeners: Vec<(u64, Listener<T>)>,
    next_id: u64,
}

/// Broadcasts events to every subscribed callback.
///
/// Callbacks run synchronously on the thread that calls [`Emitter::fire`],
/// in subscription order. No lock is held while a callback runs, so a
/// callback may subscribe, unsubscribe or fire again.
pub struct Emitter<T> {
    inner: Arc<Mutex<EmitterInner<T>>>,
}

impl<T: 'static> Emitter<T> {
    /// Creates an emitter with no subscribers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(EmitterInner {
                listeners: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Subscribes `listener`; the returned handle unsubscribes it.
    pub fn event(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Disposable {
        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.push((id, Arc::new(listener)));
            id
        };

        let weak: Weak<Mutex<EmitterInner<T>>> = Arc::downgrade(&self.inner);
        Disposable::create(move || {
            if let Some(inner) = weak.upgrade() {
                inner.lock().listeners.retain(|(listener_id, _)| *listener_id != id);
            }
        })
    }

    /// Delivers `event` to every current subscriber.
    pub fn fire(&self, event: &T) {
        let listeners: Vec<Listener<T>> = self
            .inner
            .lock()
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener(event);
        }
    }

    /// Number of current subscribers.
    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// Drops every subscriber.
    pub fn clear(&self) {
        self.inner.lock().listeners.clear();
    }
}

impl<T: 'static> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.inner.lock().listeners.len())
            .finish()
    }
}
