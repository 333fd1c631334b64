//! Inbound event dispatch.
//!
//! Routes decoded server events to conversation store mutations. Events are
//! applied synchronously and atomically with respect to one another, in
//! arrival order; the single-threaded model means no event's effects ever
//! interleave with another's.
//!
//! After every store mutation the dispatcher runs the unread aggregator, so
//! derived counters are recomputed on the event path itself rather than in
//! any UI refresh mechanism.

use hirewire_proto::ServerEvent;

use crate::{aggregator::UnreadAggregator, store::ConversationStore};

/// Applies server events to the store and keeps derived state current.
pub struct Dispatcher {
    aggregator: UnreadAggregator,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Create a dispatcher with a fresh aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self { aggregator: UnreadAggregator::new() }
    }

    /// The unread aggregator fed by this dispatcher. Subscribe here for
    /// badge updates.
    #[must_use]
    pub fn aggregator(&self) -> &UnreadAggregator {
        &self.aggregator
    }

    /// Apply one decoded event to the store, then recompute derived state.
    ///
    /// Session-level events that reach the dispatcher are ignored; they are
    /// consumed by the connection layer and carry no store meaning.
    pub fn dispatch(&mut self, store: &mut ConversationStore, event: ServerEvent) {
        match event {
            ServerEvent::MessageNew(wire) => {
                store.append_message(wire);
            },
            ServerEvent::ConversationUpdated(summary) => {
                store.upsert_conversation(summary);
            },
            ServerEvent::PresenceChanged(change) => {
                store.presence_changed(change.user_id, change.online);
            },
            ServerEvent::Resync(snapshot) => {
                store.replace_all(snapshot);
            },
            ServerEvent::AuthOk(_)
            | ServerEvent::AuthRejected(_)
            | ServerEvent::MessageAck(_)
            | ServerEvent::Pong => {
                tracing::debug!(event = event.event_name(), "session event has no store effect");
            },
        }

        self.aggregator.observe(store);
    }

    /// Recompute derived state after a local store mutation (send echo,
    /// mark-read, focus change).
    pub fn observe(&mut self, store: &ConversationStore) {
        self.aggregator.observe(store);
    }
}
