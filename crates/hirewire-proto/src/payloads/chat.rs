//! Conversation and message payloads.
//!
//! Field names follow the wire's camelCase convention. All structs are
//! permissive about optional fields so that partial conversation updates
//! merge into client state instead of clobbering it.

use serde::{Deserialize, Serialize};

use crate::{ConversationId, MessageId, UserId};

/// A message as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    /// Server-assigned message id.
    pub id: MessageId,

    /// Conversation this message belongs to.
    pub conversation_id: ConversationId,

    /// Author of the message.
    pub sender_id: UserId,

    /// Message text.
    pub body: String,

    /// Send timestamp, milliseconds since the Unix epoch.
    pub sent_at: i64,

    /// Sender-local sequence number, breaking `sent_at` ties. Inbound
    /// messages carry the server's sequence here.
    #[serde(default)]
    pub seq: u64,
}

/// Partial conversation state, merged into the client store by id.
///
/// Absent optional fields mean "unchanged", which is why they are `Option`
/// rather than defaulted values: an update that omits `unreadCount` must not
/// reset the client's counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Conversation id. Required; a summary without an id is malformed.
    pub id: ConversationId,

    /// Participants, unordered. Empty means "unchanged".
    #[serde(default)]
    pub participant_ids: Vec<UserId>,

    /// Preview of the most recent message.
    #[serde(default)]
    pub last_message_preview: Option<String>,

    /// Timestamp of the most recent activity, milliseconds since epoch.
    #[serde(default)]
    pub last_activity_at: Option<i64>,

    /// Server-side unread count. Only present on resync snapshots; live
    /// updates leave the client-maintained counter alone.
    #[serde(default)]
    pub unread_count: Option<u32>,
}

impl ConversationSummary {
    /// Create a minimal summary carrying only the id.
    #[must_use]
    pub fn new(id: impl Into<ConversationId>) -> Self {
        Self {
            id: id.into(),
            participant_ids: Vec::new(),
            last_message_preview: None,
            last_activity_at: None,
            unread_count: None,
        }
    }
}

/// A participant's presence changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceChange {
    /// User whose presence changed.
    pub user_id: UserId,

    /// Whether the user is now online.
    pub online: bool,
}

/// Server acknowledgment of an outbound message.
///
/// Carries the client's `localSeq` so the pending send can be resolved, plus
/// the authoritative id and timestamp the server assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageAck {
    /// Client-assigned sequence number of the acknowledged send.
    pub local_seq: u64,

    /// Server-assigned message id.
    pub id: MessageId,

    /// Authoritative send timestamp, milliseconds since epoch.
    pub sent_at: i64,
}

/// Full conversation state snapshot, sent in response to a resync request.
///
/// A snapshot supersedes all client state: after a reconnect there is no
/// ordering guarantee relative to pre-disconnect events, so the client
/// replaces its store rather than merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResyncState {
    /// Every conversation visible to the session.
    pub conversations: Vec<ConversationHistory>,
}

/// One conversation's summary plus message history, as carried in a resync
/// snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationHistory {
    /// Conversation summary fields.
    #[serde(flatten)]
    pub summary: ConversationSummary,

    /// Message history, server order.
    #[serde(default)]
    pub messages: Vec<WireMessage>,
}

/// Outbound message send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    /// Target conversation.
    pub conversation_id: ConversationId,

    /// Message text.
    pub body: String,

    /// Client-assigned sequence number; echoed back in the ack.
    pub local_seq: u64,

    /// Client send timestamp, milliseconds since epoch. The server may
    /// replace it with its own clock in the ack.
    pub sent_at: i64,
}

/// Outbound mark-read notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRead {
    /// Conversation whose unread count is being reset.
    pub conversation_id: ConversationId,
}
