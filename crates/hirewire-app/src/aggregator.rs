//! Unread aggregation.
//!
//! Derives the global unread badge from the conversation store. The
//! aggregator is the only producer of badge values: UI code subscribes to
//! its output instead of recomputing counts in render paths.
//!
//! Emission is edge-triggered. The exact total is recomputed after every
//! store mutation and compared against the previously emitted value;
//! subscribers are only notified when it actually changed, so redundant
//! re-renders never happen.

use hirewire_core::{SignalHub, Subscription};

use crate::{state::Badge, store::ConversationStore};

/// Edge-triggered unread badge source.
pub struct UnreadAggregator {
    last_emitted: Option<u64>,
    signals: SignalHub<Badge>,
}

impl Default for UnreadAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl UnreadAggregator {
    /// Create an aggregator that has emitted nothing yet.
    #[must_use]
    pub fn new() -> Self {
        Self { last_emitted: None, signals: SignalHub::new() }
    }

    /// Subscribe to badge changes. The callback fires only when the total
    /// actually changes, starting with the first observation.
    pub fn subscribe(&self, callback: impl FnMut(&Badge) + 'static) -> Subscription {
        self.signals.subscribe(callback)
    }

    /// Last emitted total, if any.
    #[must_use]
    pub fn last_emitted(&self) -> Option<u64> {
        self.last_emitted
    }

    /// Recompute the total and notify subscribers when it changed.
    ///
    /// Returns the badge when a notification was emitted, `None` when the
    /// value was unchanged.
    pub fn observe(&mut self, store: &ConversationStore) -> Option<Badge> {
        let total = store.total_unread();
        if self.last_emitted == Some(total) {
            return None;
        }

        self.last_emitted = Some(total);
        let badge = Badge::new(total);
        self.signals.emit(&badge);
        Some(badge)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use hirewire_proto::payloads::chat::WireMessage;

    use super::*;

    fn wire(id: &str, sent_at: i64) -> WireMessage {
        WireMessage {
            id: id.to_string(),
            conversation_id: "c1".to_string(),
            sender_id: "u2".to_string(),
            body: "hello".to_string(),
            sent_at,
            seq: 0,
        }
    }

    #[test]
    fn emits_only_on_change() {
        let mut aggregator = UnreadAggregator::new();
        let mut store = ConversationStore::new("u1");

        let emissions: Rc<RefCell<Vec<u64>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = emissions.clone();
        let _sub = aggregator.subscribe(move |badge| sink.borrow_mut().push(badge.total()));

        // First observation emits the initial value.
        aggregator.observe(&store);
        // Unchanged: no emission.
        aggregator.observe(&store);

        store.append_message(wire("m1", 100));
        aggregator.observe(&store);

        // A mutation that does not affect the total stays silent.
        store.presence_changed("u2".to_string(), true);
        aggregator.observe(&store);

        assert_eq!(*emissions.borrow(), vec![0, 1]);
    }

    #[test]
    fn mark_read_emits_the_restored_value() {
        let mut aggregator = UnreadAggregator::new();
        let mut store = ConversationStore::new("u1");

        aggregator.observe(&store);
        store.append_message(wire("m1", 100));
        store.append_message(wire("m2", 200));
        aggregator.observe(&store);
        assert_eq!(aggregator.last_emitted(), Some(2));

        store.mark_read("c1");
        let badge = aggregator.observe(&store);
        assert_eq!(badge.map(|b| b.total()), Some(0));
    }
}
