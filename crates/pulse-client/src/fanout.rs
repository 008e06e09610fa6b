//! Event fan-out registry.
//!
//! Consumers register a callback and get back a [`Subscription`] handle.
//! Every published [`UpdateDescriptor`] reaches every registered callback
//! exactly once, in registration order. Removal happens only through
//! [`Subscription::unsubscribe`]; dropping the handle leaves the callback
//! registered.
//!
//! Publishing is synchronous. A panicking callback is logged and skipped and
//! the remaining callbacks still run. The callback list is snapshotted
//! before delivery, so callbacks may subscribe or unsubscribe re-entrantly;
//! such changes take effect from the next publish.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use pulse_core::UpdateDescriptor;
use tracing::{error, trace};

type Callback = Arc<dyn Fn(&UpdateDescriptor) + Send + Sync>;

struct Entry {
    id: u64,
    callback: Callback,
}

#[derive(Default)]
struct Inner {
    entries: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
}

impl Inner {
    fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        entries.len() != before
    }
}

/// Outcome of one publish.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Callbacks that returned normally.
    pub delivered: usize,
    /// Callbacks that panicked.
    pub failed: usize,
}

/// Registry of update consumers. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct UpdateRegistry {
    inner: Arc<Inner>,
}

impl UpdateRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` and return its disposer.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&UpdateDescriptor) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.entries.lock().push(Entry {
            id,
            callback: Arc::new(callback),
        });
        trace!(subscription_id = id, "update subscriber added");
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `descriptor` to every current subscriber.
    pub fn publish(&self, descriptor: &UpdateDescriptor) -> PublishReport {
        let snapshot: Vec<(u64, Callback)> = self
            .inner
            .entries
            .lock()
            .iter()
            .map(|e| (e.id, Arc::clone(&e.callback)))
            .collect();

        let mut report = PublishReport::default();
        for (id, callback) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| callback(descriptor))) {
                Ok(()) => report.delivered += 1,
                Err(panic) => {
                    report.failed += 1;
                    error!(
                        subscription_id = id,
                        kind = %descriptor.kind,
                        panic = panic_message(panic.as_ref()),
                        "update subscriber panicked"
                    );
                }
            }
        }
        report
    }

    /// Number of registered callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.inner.entries.lock().len()
    }
}

impl std::fmt::Debug for UpdateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateRegistry")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Disposer for one registered callback.
#[must_use = "dropping a Subscription keeps the callback registered; call unsubscribe() to remove it"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Inner>,
}

impl Subscription {
    /// Registry-assigned id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove the callback. Returns `false` if it was already removed or the
    /// registry is gone. Safe to call repeatedly.
    pub fn unsubscribe(&self) -> bool {
        let removed = self
            .registry
            .upgrade()
            .is_some_and(|inner| inner.remove(self.id));
        if removed {
            trace!(subscription_id = self.id, "update subscriber removed");
        }
        removed
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
