//! Application input events.
//!
//! [`AppEvent`] is the set of inputs that drive the [`crate::App`] state
//! machine. Events originate from two sources:
//! - connection notifications translated from the underlying client
//!   (lifecycle changes, delivered domain events, send resolutions)
//! - local actions echoed back by the bridge (queued and retried sends)

use hirewire_client::SendOutcome;
use hirewire_proto::{ConversationId, ServerEvent};

/// Events processed by the App state machine.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Periodic tick.
    Tick,

    /// Connection attempt started.
    Connecting,

    /// Handshake accepted; the channel is live.
    Connected,

    /// The channel went away (drop, exhausted retries, or close).
    Disconnected {
        /// Why the channel went away.
        reason: String,
    },

    /// A connection attempt failed.
    ConnectError {
        /// What went wrong.
        reason: String,
    },

    /// A domain event was delivered by the client.
    EventReceived(ServerEvent),

    /// A local send was queued; echo it as a pending message.
    MessageQueued {
        /// Target conversation.
        conversation_id: ConversationId,
        /// Client-assigned sequence number.
        local_seq: u64,
        /// Message text.
        body: String,
        /// Send timestamp, milliseconds since epoch.
        sent_at: i64,
    },

    /// A failed send is being retried.
    MessageRetrying {
        /// Sequence number of the retried send.
        local_seq: u64,
    },

    /// A tracked send concluded.
    SendResolved {
        /// Sequence number of the resolved send.
        local_seq: u64,
        /// How it concluded.
        outcome: SendOutcome,
    },
}
