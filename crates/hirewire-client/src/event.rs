//! Client events and actions.
//!
//! The caller (driver or bridge) is responsible for:
//! - Receiving envelopes from the transport and feeding them in
//! - Reporting transport establishment and loss
//! - Driving time forward via ticks
//! - Forwarding application intents (send message, mark read, etc.)
//!
//! The client responds with [`ClientAction`]s the caller executes: envelopes
//! to write, domain events to deliver to the store, lifecycle signals to fan
//! out, and per-send resolutions.

use hirewire_core::Lifecycle;
use hirewire_proto::{ConversationId, Envelope, MessageId, ServerEvent};

/// Events the caller feeds into the client.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The driver established the physical channel.
    TransportUp,

    /// The physical channel failed or dropped.
    TransportLost {
        /// Driver-supplied reason.
        reason: String,
    },

    /// Envelope received from the server.
    EnvelopeReceived(Envelope),

    /// Periodic tick for timeout processing.
    ///
    /// The caller should send ticks periodically to let the client detect
    /// retry deadlines, ack timeouts, and idle channels.
    Tick,

    /// Application wants to send a message.
    SendMessage {
        /// Target conversation.
        conversation_id: ConversationId,
        /// Message text.
        body: String,
        /// Wall-clock send time, milliseconds since the Unix epoch.
        sent_at: i64,
    },

    /// Application wants to retry a failed send, keeping its sequence
    /// number (and therefore its position in the conversation).
    RetryMessage {
        /// Target conversation.
        conversation_id: ConversationId,
        /// Sequence number of the failed send.
        local_seq: u64,
        /// Message text.
        body: String,
        /// Original send timestamp.
        sent_at: i64,
    },

    /// Application marked a conversation read.
    MarkRead {
        /// Conversation whose unread count was reset.
        conversation_id: ConversationId,
    },

    /// Application wants a full state snapshot.
    RequestResync,
}

/// How a tracked send concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The server accepted the message and assigned its id.
    Acknowledged {
        /// Server-assigned message id.
        id: MessageId,
        /// Authoritative send timestamp.
        sent_at: i64,
    },

    /// No acknowledgment arrived; the UI may offer retry.
    Failed {
        /// Why the send failed.
        reason: String,
    },
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Open the physical channel.
    StartTransport,

    /// Send an envelope to the server.
    Send(Envelope),

    /// Close the physical channel.
    CloseTransport {
        /// Reason for closing.
        reason: String,
    },

    /// Deliver a domain event to the conversation store.
    Deliver(ServerEvent),

    /// Fan a lifecycle signal out to subscribers.
    Notify(Lifecycle),

    /// A local send was queued; the store should append a pending message
    /// so the UI can echo it immediately.
    SendQueued {
        /// Target conversation.
        conversation_id: ConversationId,
        /// Client-assigned sequence number.
        local_seq: u64,
        /// Message text.
        body: String,
        /// Send timestamp, milliseconds since epoch.
        sent_at: i64,
    },

    /// A failed send is being retried; the store should flip it back to
    /// pending.
    SendRetrying {
        /// Sequence number of the retried send.
        local_seq: u64,
    },

    /// A tracked send concluded; the store should update the message's
    /// delivery state.
    SendResolved {
        /// Sequence number of the resolved send.
        local_seq: u64,
        /// How it concluded.
        outcome: SendOutcome,
    },
}
