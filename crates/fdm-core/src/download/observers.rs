//! Append-only observer registries for progress and completion fan-out.
//!
//! Registration is monotonic: observers are never removed for the
//! operator's lifetime, so reads take a snapshot under a shared lock while
//! appends take the exclusive lock briefly. Observers registered after an
//! event was dispatched do not see it replayed.

use std::sync::{Arc, RwLock};

/// Ordered, append-only list of observers.
pub(super) struct Registry<T: ?Sized> {
    entries: RwLock<Vec<Arc<T>>>,
}

impl<T: ?Sized> Registry<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Append an observer; insertion order is the delivery order.
    pub fn push(&self, observer: Arc<T>) {
        self.entries.write().unwrap().push(observer);
    }

    /// Snapshot of the current observers, in registration order.
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.entries.read().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }
}
