//! Observable application state types.
//!
//! This module defines the data structures that represent the application's
//! current view of the world: [`Conversation`], [`Message`], the channel
//! status, and the unread [`Badge`].
//!
//! These structures are the "View Model" for the messaging UI. They contain
//! the subset of protocol state necessary for rendering without exposing
//! connection mechanics. All mutation goes through the store; collaborators
//! only ever read.

use std::collections::HashSet;

use hirewire_proto::{
    ConversationId, MessageId, UserId,
    payloads::chat::{ConversationSummary, WireMessage},
};

/// Realtime channel status, as the UI sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// Not connected to the server.
    Disconnected,
    /// Connection in progress.
    Connecting,
    /// Connected with an accepted handshake.
    Connected,
}

/// Delivery state of a message this session sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Sent to the server, awaiting acknowledgment.
    Pending,
    /// Acknowledged by the server.
    Sent,
    /// No acknowledgment arrived; the UI may offer retry.
    Failed,
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message id. Server-assigned for inbound and acknowledged messages;
    /// a local placeholder until then.
    pub id: MessageId,
    /// Conversation this message belongs to.
    pub conversation_id: ConversationId,
    /// Author of the message.
    pub sender_id: UserId,
    /// Message text.
    pub body: String,
    /// Send timestamp, milliseconds since the Unix epoch.
    pub sent_at: i64,
    /// Sequence number breaking `sent_at` ties. Never compare ids for
    /// ordering; ids are opaque and may be assigned late.
    pub local_seq: u64,
    /// Delivery state. Inbound messages are always `Sent`.
    pub delivery: Delivery,
}

impl Message {
    /// Build a message from its wire form. Inbound messages are by
    /// definition delivered.
    #[must_use]
    pub fn from_wire(wire: WireMessage) -> Self {
        Self {
            id: wire.id,
            conversation_id: wire.conversation_id,
            sender_id: wire.sender_id,
            body: wire.body,
            sent_at: wire.sent_at,
            local_seq: wire.seq,
            delivery: Delivery::Sent,
        }
    }

    /// Ordering key within a conversation.
    #[must_use]
    pub fn sort_key(&self) -> (i64, u64) {
        (self.sent_at, self.local_seq)
    }
}

/// A conversation thread and its message history.
///
/// Fields are private: every mutation goes through the store's operations so
/// the unread arithmetic and ordering invariants cannot be bypassed.
#[derive(Debug, Clone)]
pub struct Conversation {
    id: ConversationId,
    participants: HashSet<UserId>,
    last_message_preview: Option<String>,
    last_activity_at: Option<i64>,
    unread_count: u32,
    messages: Vec<Message>,
    message_ids: HashSet<MessageId>,
}

impl Conversation {
    /// Create an empty conversation.
    #[must_use]
    pub fn new(id: impl Into<ConversationId>) -> Self {
        Self {
            id: id.into(),
            participants: HashSet::new(),
            last_message_preview: None,
            last_activity_at: None,
            unread_count: 0,
            messages: Vec::new(),
            message_ids: HashSet::new(),
        }
    }

    /// Conversation id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Participants, unordered.
    #[must_use]
    pub fn participants(&self) -> &HashSet<UserId> {
        &self.participants
    }

    /// Preview of the most recent message, if any.
    #[must_use]
    pub fn last_message_preview(&self) -> Option<&str> {
        self.last_message_preview.as_deref()
    }

    /// Timestamp of the most recent activity, if any.
    #[must_use]
    pub fn last_activity_at(&self) -> Option<i64> {
        self.last_activity_at
    }

    /// Messages received after the conversation was last marked read.
    #[must_use]
    pub fn unread_count(&self) -> u32 {
        self.unread_count
    }

    /// Message history, ordered by `(sent_at, local_seq)`.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether a message with this id is already present.
    #[must_use]
    pub fn contains_message(&self, id: &str) -> bool {
        self.message_ids.contains(id)
    }

    /// Merge summary fields. Absent optional fields leave state unchanged;
    /// in particular the unread count is only touched when the summary
    /// explicitly carries one.
    pub(crate) fn apply_summary(&mut self, summary: ConversationSummary) {
        if !summary.participant_ids.is_empty() {
            self.participants = summary.participant_ids.into_iter().collect();
        }
        if summary.last_message_preview.is_some() {
            self.last_message_preview = summary.last_message_preview;
        }
        if summary.last_activity_at.is_some() {
            self.last_activity_at = summary.last_activity_at;
        }
        if let Some(unread) = summary.unread_count {
            self.unread_count = unread;
        }
    }

    /// Insert at the position implied by `(sent_at, local_seq)`. A duplicate
    /// id is a no-op and returns false.
    pub(crate) fn insert_message(&mut self, message: Message) -> bool {
        if !self.message_ids.insert(message.id.clone()) {
            return false;
        }

        self.last_activity_at = Some(
            self.last_activity_at.map_or(message.sent_at, |at| at.max(message.sent_at)),
        );
        self.last_message_preview = Some(message.body.clone());

        let key = message.sort_key();
        let index = self.messages.partition_point(|m| m.sort_key() <= key);
        self.messages.insert(index, message);
        true
    }

    /// Remove a message by id. Used when an acknowledgment reveals a local
    /// echo duplicates a server-delivered message.
    pub(crate) fn remove_message(&mut self, id: &str) -> Option<Message> {
        if !self.message_ids.remove(id) {
            return None;
        }
        let index = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(index))
    }

    /// Locate a message sent by this session, by sequence number.
    pub(crate) fn position_by_seq(&self, local_seq: u64, sender: &str) -> Option<usize> {
        self.messages
            .iter()
            .position(|m| m.local_seq == local_seq && m.sender_id == sender)
    }

    pub(crate) fn message_mut(&mut self, index: usize) -> &mut Message {
        &mut self.messages[index]
    }

    /// Re-key a message id in the duplicate index.
    pub(crate) fn rekey_message(&mut self, old_id: &str, new_id: MessageId) {
        self.message_ids.remove(old_id);
        self.message_ids.insert(new_id);
    }

    pub(crate) fn set_unread(&mut self, unread: u32) {
        self.unread_count = unread;
    }

    pub(crate) fn increment_unread(&mut self) {
        self.unread_count += 1;
    }
}

/// Derived unread badge.
///
/// The integer total is exact and never clamped; the clamp to `"99+"` is a
/// presentation concern applied only when formatting the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Badge {
    total: u64,
}

impl Badge {
    /// Largest total displayed verbatim; everything above shows as `"99+"`.
    pub const DISPLAY_CEILING: u64 = 99;

    /// Create a badge for an exact total.
    #[must_use]
    pub fn new(total: u64) -> Self {
        Self { total }
    }

    /// Exact unread total.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Display label, clamped at the presentation ceiling.
    #[must_use]
    pub fn label(&self) -> String {
        if self.total > Self::DISPLAY_CEILING {
            format!("{}+", Self::DISPLAY_CEILING)
        } else {
            self.total.to_string()
        }
    }
}
