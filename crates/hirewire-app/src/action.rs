//! Application side-effects and intents.
//!
//! [`AppAction`] is the instruction set the [`crate::App`] state machine
//! produces for the runtime to execute: render requests, connection
//! management, and outbound protocol operations routed through the bridge.

use hirewire_proto::{ConversationId, UserId};

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Open the session connection with this credential.
    Connect {
        /// Authenticated user.
        user_id: UserId,
        /// Bearer token from the auth layer.
        token: String,
    },

    /// Tear the session connection down.
    Disconnect,

    /// Send a message.
    SendMessage {
        /// Target conversation.
        conversation_id: ConversationId,
        /// Message text.
        body: String,
        /// Send timestamp, milliseconds since epoch.
        sent_at: i64,
    },

    /// Retry a failed send under its original sequence number.
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

    /// Tell the server a conversation was read.
    MarkRead {
        /// Conversation whose unread count was reset.
        conversation_id: ConversationId,
    },

    /// Request a full state snapshot.
    RequestResync,
}
