//! Typed publish/subscribe fan-out.
//!
//! [`SignalHub`] carries lifecycle signals and derived-state notifications to
//! any number of subscribers. Emission is multi-subscriber fan-out, not
//! consume-once: every live handle observes every emitted value.
//!
//! # Guarantees
//!
//! - Handles are notified in subscription order.
//! - Cancelling a handle during a notification pass neither skips nor
//!   double-notifies the remaining handles; the cancelled handle simply stops
//!   receiving values.
//! - A callback may cancel its own subscription.
//!
//! The hub is single-threaded by design: the whole subsystem serializes
//! mutation onto one logical thread of control, so callbacks run inline on
//! the emitting path.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

/// Subscriber callback storage.
///
/// The callback slot is vacated while its callback runs, which is what makes
/// reentrant cancellation safe: a cancel during notification removes the
/// slot, and the returning callback is discarded instead of restored.
struct Slot<T> {
    id: u64,
    callback: Option<Box<dyn FnMut(&T)>>,
}

struct Registry<T> {
    slots: Vec<Slot<T>>,
    next_id: u64,
}

impl<T> Registry<T> {
    fn position(&self, id: u64) -> Option<usize> {
        self.slots.iter().position(|slot| slot.id == id)
    }
}

/// Multi-subscriber signal fan-out with disposable handles.
pub struct SignalHub<T> {
    inner: Rc<RefCell<Registry<T>>>,
}

impl<T> Default for SignalHub<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SignalHub<T> {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Rc::new(RefCell::new(Registry { slots: Vec::new(), next_id: 0 })) }
    }

    /// Register a callback. Returns a disposable handle; the callback stays
    /// registered until [`Subscription::cancel`] is called.
    pub fn subscribe(&self, callback: impl FnMut(&T) + 'static) -> Subscription
    where
        T: 'static,
    {
        let id = {
            let mut registry = self.inner.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.slots.push(Slot { id, callback: Some(Box::new(callback)) });
            id
        };

        let weak: Weak<RefCell<Registry<T>>> = Rc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let mut registry = inner.borrow_mut();
                    if let Some(index) = registry.position(id) {
                        registry.slots.remove(index);
                    }
                }
            })),
        }
    }

    /// Notify every live subscriber, in subscription order.
    pub fn emit(&self, value: &T) {
        // Snapshot ids up front; subscriptions added during this pass are
        // not notified until the next emit.
        let ids: Vec<u64> = self.inner.borrow().slots.iter().map(|slot| slot.id).collect();

        for id in ids {
            let taken = {
                let mut registry = self.inner.borrow_mut();
                registry.position(id).and_then(|index| registry.slots[index].callback.take())
            };

            let Some(mut callback) = taken else {
                // Cancelled by an earlier callback in this pass.
                continue;
            };

            callback(value);

            let mut registry = self.inner.borrow_mut();
            if let Some(index) = registry.position(id) {
                registry.slots[index].callback = Some(callback);
            }
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().slots.len()
    }
}

/// Disposable handle to a [`SignalHub`] subscription.
///
/// Dropping the handle without calling [`cancel`](Self::cancel) leaves the
/// subscription active for the hub's lifetime, mirroring an `on` registration
/// that was never paired with `off`.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Remove the subscription from its hub. Safe to call while the hub is
    /// mid-notification.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
