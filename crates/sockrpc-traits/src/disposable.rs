//! Run-once teardown handles and disposal groups.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Action = Box<dyn FnOnce() + Send>;

/// A handle that undoes a registration when disposed.
///
/// Dropping a handle without calling [`Disposable::dispose`] leaves the
/// registration in place.
pub struct Disposable {
    action: Option<Action>,
}

impl Disposable {
    /// Creates a handle that runs `action` on dispose.
    pub fn create(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            action: Some(Box::new(action)),
        }
    }

    /// Creates a handle that does nothing on dispose.
    pub const fn none() -> Self {
        Self { action: None }
    }

    /// Runs the teardown action.
    pub fn dispose(mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

impl fmt::Debug for Disposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposable")
            .field("pending", &self.action.is_some())
            .finish()
    }
}

impl Default for Disposable {
    fn default() -> Self {
        Self::none()
    }
}

#[derive(Default)]
struct CollectionInner {
    entries: Vec<(u64, Action)>,
    next_id: u64,
    disposed: bool,
}

/// A disposal group.
///
/// Every pushed action runs exactly once, when the group is disposed.
/// Disposing a second time is a no-op, and actions pushed after disposal
/// run immediately.
#[derive(Clone, Default)]
pub struct DisposableCollection {
    inner: Arc<Mutex<CollectionInner>>,
}

impl DisposableCollection {
    /// Creates an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an action to the group.
    ///
    /// The returned handle removes the action without running it.
    pub fn push(&self, action: impl FnOnce() + Send + 'static) -> Disposable {
        let mut inner = self.inner.lock();
        if inner.disposed {
            drop(inner);
            action();
            return Disposable::none();
        }

        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.push((id, Box::new(action)));

        let weak: Weak<Mutex<CollectionInner>> = Arc::downgrade(&self.inner);
        Disposable::create(move || {
            if let Some(inner) = weak.upgrade() {
                inner.lock().entries.retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }

    /// Runs every action, most recently pushed first.
    pub fn dispose(&self) {
        let entries = {
            let mut inner = self.inner.lock();
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            std::mem::take(&mut inner.entries)
        };

        for (_, action) in entries.into_iter().rev() {
            action();
        }
    }

    /// Returns `true` once [`DisposableCollection::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }

    /// Number of actions still waiting to run.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Returns `true` if no actions are waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for DisposableCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("DisposableCollection")
            .field("entries", &inner.entries.len())
            .field("disposed", &inner.disposed)
            .finish()
    }
}
