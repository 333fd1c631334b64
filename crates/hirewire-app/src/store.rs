//! Conversation store.
//!
//! Process-local cache of conversations, their message histories, unread
//! counts, and participant presence. Session-scoped: built from resync
//! snapshots and inbound events, never persisted.
//!
//! # Invariants
//!
//! - Conversations are upserted by id, never duplicated; no conversation
//!   exists without a non-empty id.
//! - A message id appears at most once per conversation; duplicate appends
//!   (resync, redelivery) are no-ops.
//! - `total_unread()` is a pure fold over per-conversation counts; nothing
//!   maintains a separate total that could drift.

use std::collections::{HashMap, HashSet};

use hirewire_client::SendOutcome;
use hirewire_proto::{
    ConversationId, UserId,
    payloads::chat::{ConversationSummary, ResyncState, WireMessage},
};

use crate::state::{Conversation, Delivery, Message};

/// Process-local conversation cache.
pub struct ConversationStore {
    /// User this session belongs to. Own messages never count as unread.
    self_user: UserId,
    conversations: HashMap<ConversationId, Conversation>,
    /// Conversation currently open in the UI, if any.
    focused: Option<ConversationId>,
    /// Participants currently online.
    online: HashSet<UserId>,
}

impl ConversationStore {
    /// Create an empty store for a session user.
    #[must_use]
    pub fn new(self_user: impl Into<UserId>) -> Self {
        Self {
            self_user: self_user.into(),
            conversations: HashMap::new(),
            focused: None,
            online: HashSet::new(),
        }
    }

    /// User this session belongs to.
    #[must_use]
    pub fn self_user(&self) -> &str {
        &self.self_user
    }

    /// All conversations, keyed by id.
    #[must_use]
    pub fn conversations(&self) -> &HashMap<ConversationId, Conversation> {
        &self.conversations
    }

    /// A conversation by id.
    #[must_use]
    pub fn conversation(&self, id: &str) -> Option<&Conversation> {
        self.conversations.get(id)
    }

    /// Currently focused conversation, if any.
    #[must_use]
    pub fn focused(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    /// Whether a participant is currently online.
    #[must_use]
    pub fn is_online(&self, user_id: &str) -> bool {
        self.online.contains(user_id)
    }

    /// Exact unread total across all conversations.
    ///
    /// Pure fold over current state; the badge total is always recomputed
    /// from here, never mutated independently.
    #[must_use]
    pub fn total_unread(&self) -> u64 {
        self.conversations.values().map(|c| u64::from(c.unread_count())).sum()
    }

    /// Merge summary fields into the conversation, inserting it if new.
    ///
    /// Does not touch the unread count unless the summary explicitly
    /// carries one. Summaries with an empty id are rejected.
    pub fn upsert_conversation(&mut self, summary: ConversationSummary) -> bool {
        if summary.id.is_empty() {
            tracing::warn!("rejecting conversation summary with empty id");
            return false;
        }

        let conversation = self
            .conversations
            .entry(summary.id.clone())
            .or_insert_with(|| Conversation::new(summary.id.clone()));
        conversation.apply_summary(summary);
        true
    }

    /// Append an inbound message at its ordered position.
    ///
    /// Increments the conversation's unread count by exactly 1 unless the
    /// conversation is focused or the message is the session user's own. A
    /// duplicate id (resync, redelivery) is a no-op. Returns whether the
    /// store changed.
    pub fn append_message(&mut self, wire: WireMessage) -> bool {
        if wire.conversation_id.is_empty() {
            tracing::warn!("rejecting message with empty conversation id");
            return false;
        }

        let conversation = self
            .conversations
            .entry(wire.conversation_id.clone())
            .or_insert_with(|| Conversation::new(wire.conversation_id.clone()));

        let sender = wire.sender_id.clone();
        let message = Message::from_wire(wire);
        if !conversation.insert_message(message) {
            return false;
        }

        let focused = self.focused.as_deref() == Some(conversation.id());
        if !focused && sender != self.self_user {
            conversation.increment_unread();
        }
        true
    }

    /// Append a locally sent message as pending, for immediate UI echo.
    ///
    /// The id is a local placeholder until the acknowledgment adopts the
    /// server-assigned one. Never affects unread counts.
    pub fn append_local(
        &mut self,
        conversation_id: ConversationId,
        local_seq: u64,
        body: String,
        sent_at: i64,
    ) {
        let conversation = self
            .conversations
            .entry(conversation_id.clone())
            .or_insert_with(|| Conversation::new(conversation_id.clone()));

        let message = Message {
            id: format!("local-{local_seq}"),
            conversation_id,
            sender_id: self.self_user.clone(),
            body,
            sent_at,
            local_seq,
            delivery: Delivery::Pending,
        };
        conversation.insert_message(message);
    }

    /// Resolve a pending send.
    ///
    /// On acknowledgment the message adopts the server id and timestamp and
    /// becomes `Sent`; if the server already delivered the same message
    /// under that id (echo raced the ack), the local copy is dropped
    /// instead. On failure the message flips to `Failed` so the UI can
    /// offer retry.
    pub fn resolve_send(&mut self, local_seq: u64, outcome: &SendOutcome) {
        let self_user = self.self_user.clone();
        let Some(conversation) = self
            .conversations
            .values_mut()
            .find(|c| c.position_by_seq(local_seq, &self_user).is_some())
        else {
            tracing::debug!(local_seq, "resolution for unknown send");
            return;
        };

        let Some(index) = conversation.position_by_seq(local_seq, &self_user) else {
            return;
        };

        match outcome {
            SendOutcome::Acknowledged { id, sent_at } => {
                if conversation.contains_message(id) {
                    let local_id = conversation.message_mut(index).id.clone();
                    conversation.remove_message(&local_id);
                    return;
                }

                // Adopt the authoritative id and timestamp, then reinsert so
                // ordering follows the server clock.
                let message = conversation.message_mut(index);
                let old_id = message.id.clone();
                message.id = id.clone();
                message.sent_at = *sent_at;
                message.delivery = Delivery::Sent;
                conversation.rekey_message(&old_id, id.clone());

                let message = conversation.remove_message(&id.clone());
                if let Some(message) = message {
                    conversation.insert_message(message);
                }
            },
            SendOutcome::Failed { .. } => {
                conversation.message_mut(index).delivery = Delivery::Failed;
            },
        }
    }

    /// Flip a failed send back to pending (retry in flight).
    pub fn retry_pending(&mut self, local_seq: u64) {
        let self_user = self.self_user.clone();
        for conversation in self.conversations.values_mut() {
            if let Some(index) = conversation.position_by_seq(local_seq, &self_user) {
                conversation.message_mut(index).delivery = Delivery::Pending;
                return;
            }
        }
    }

    /// Reset a conversation's unread count to 0. Message history untouched.
    /// Returns whether the count changed.
    pub fn mark_read(&mut self, conversation_id: &str) -> bool {
        match self.conversations.get_mut(conversation_id) {
            Some(conversation) if conversation.unread_count() > 0 => {
                conversation.set_unread(0);
                true
            },
            _ => false,
        }
    }

    /// Track which conversation is open in the UI. Focusing a conversation
    /// marks it read; inbound messages for the focused conversation do not
    /// increment its unread count.
    pub fn set_focused(&mut self, conversation_id: Option<ConversationId>) {
        if let Some(id) = &conversation_id {
            self.mark_read(id);
        }
        self.focused = conversation_id;
    }

    /// Record a presence change.
    pub fn presence_changed(&mut self, user_id: UserId, online: bool) {
        if online {
            self.online.insert(user_id);
        } else {
            self.online.remove(&user_id);
        }
    }

    /// Replace the store with a resync snapshot.
    ///
    /// Post-reconnect state is authoritative: nothing from before the
    /// disconnect is merged. Unread counts come from the snapshot, except
    /// that the focused conversation (still open in the UI) stays read.
    /// Presence is untouched; it is maintained by live events only.
    pub fn replace_all(&mut self, snapshot: ResyncState) {
        self.conversations.clear();

        for history in snapshot.conversations {
            if history.summary.id.is_empty() {
                tracing::warn!("skipping resync conversation with empty id");
                continue;
            }

            let mut conversation = Conversation::new(history.summary.id.clone());
            let unread = history.summary.unread_count.unwrap_or(0);
            conversation.apply_summary(history.summary);
            conversation.set_unread(unread);

            for wire in history.messages {
                conversation.insert_message(Message::from_wire(wire));
            }

            self.conversations.insert(conversation.id().to_string(), conversation);
        }

        if let Some(focused) = self.focused.clone() {
            if self.conversations.contains_key(&focused) {
                self.mark_read(&focused);
            } else {
                self.focused = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(id: &str, conversation: &str, sender: &str, sent_at: i64, seq: u64) -> WireMessage {
        WireMessage {
            id: id.to_string(),
            conversation_id: conversation.to_string(),
            sender_id: sender.to_string(),
            body: format!("body {id}"),
            sent_at,
            seq,
        }
    }

    #[test]
    fn unfocused_inbound_messages_increment_unread() {
        let mut store = ConversationStore::new("u1");

        assert!(store.append_message(wire("m1", "c1", "u2", 100, 1)));
        assert!(store.append_message(wire("m2", "c1", "u2", 200, 2)));

        assert_eq!(store.conversation("c1").map(Conversation::unread_count), Some(2));
        assert_eq!(store.total_unread(), 2);
    }

    #[test]
    fn focused_conversation_does_not_accumulate_unread() {
        let mut store = ConversationStore::new("u1");
        store.append_message(wire("m1", "c1", "u2", 100, 1));
        store.set_focused(Some("c1".to_string()));

        store.append_message(wire("m2", "c1", "u2", 200, 2));
        assert_eq!(store.total_unread(), 0);

        // Other conversations still accumulate.
        store.append_message(wire("m3", "c2", "u3", 300, 1));
        assert_eq!(store.total_unread(), 1);
    }

    #[test]
    fn own_messages_never_count_as_unread() {
        let mut store = ConversationStore::new("u1");
        store.append_message(wire("m1", "c1", "u1", 100, 1));
        assert_eq!(store.total_unread(), 0);
    }

    #[test]
    fn duplicate_append_is_idempotent() {
        let mut store = ConversationStore::new("u1");

        assert!(store.append_message(wire("m1", "c1", "u2", 100, 1)));
        assert!(!store.append_message(wire("m1", "c1", "u2", 100, 1)));

        let conversation = store.conversation("c1").unwrap();
        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.unread_count(), 1);
    }

    #[test]
    fn mark_read_resets_count_and_preserves_history() {
        let mut store = ConversationStore::new("u1");
        store.append_message(wire("m1", "c1", "u2", 100, 1));
        store.append_message(wire("m2", "c1", "u2", 200, 2));

        assert!(store.mark_read("c1"));
        let conversation = store.conversation("c1").unwrap();
        assert_eq!(conversation.unread_count(), 0);
        assert_eq!(conversation.messages().len(), 2);
    }

    #[test]
    fn mark_read_survives_upserts_of_other_conversations() {
        let mut store = ConversationStore::new("u1");
        store.append_message(wire("m1", "c1", "u2", 100, 1));
        store.mark_read("c1");

        store.upsert_conversation(ConversationSummary::new("c2"));
        store.upsert_conversation(ConversationSummary::new("c3"));

        assert_eq!(store.conversation("c1").map(Conversation::unread_count), Some(0));
    }

    #[test]
    fn upsert_merges_without_clearing_unread() {
        let mut store = ConversationStore::new("u1");
        store.append_message(wire("m1", "c1", "u2", 100, 1));

        store.upsert_conversation(ConversationSummary {
            last_message_preview: Some("updated".to_string()),
            ..ConversationSummary::new("c1")
        });

        let conversation = store.conversation("c1").unwrap();
        assert_eq!(conversation.unread_count(), 1);
        assert_eq!(conversation.last_message_preview(), Some("updated"));
    }

    #[test]
    fn empty_conversation_id_is_rejected() {
        let mut store = ConversationStore::new("u1");
        assert!(!store.upsert_conversation(ConversationSummary::new("")));
        assert!(store.conversations().is_empty());
    }

    #[test]
    fn local_send_lifecycle_pending_to_sent() {
        let mut store = ConversationStore::new("u1");
        store.append_message(wire("m1", "c1", "u2", 100, 1));

        store.append_local("c1".to_string(), 1, "hello".to_string(), 150);
        let conversation = store.conversation("c1").unwrap();
        assert_eq!(conversation.messages()[1].delivery, Delivery::Pending);

        store.resolve_send(
            1,
            &SendOutcome::Acknowledged { id: "m2".to_string(), sent_at: 160 },
        );

        let conversation = store.conversation("c1").unwrap();
        let message = &conversation.messages()[1];
        assert_eq!(message.id, "m2");
        assert_eq!(message.sent_at, 160);
        assert_eq!(message.delivery, Delivery::Sent);

        // Local echo never counted as unread.
        assert_eq!(conversation.unread_count(), 1);
    }

    #[test]
    fn ack_racing_a_server_echo_deduplicates() {
        let mut store = ConversationStore::new("u1");
        store.append_local("c1".to_string(), 1, "hello".to_string(), 150);

        // The server broadcast our own message before the ack arrived.
        store.append_message(wire("m2", "c1", "u1", 160, 9));
        store.resolve_send(
            1,
            &SendOutcome::Acknowledged { id: "m2".to_string(), sent_at: 160 },
        );

        let conversation = store.conversation("c1").unwrap();
        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.messages()[0].id, "m2");
    }

    #[test]
    fn failed_send_can_be_retried() {
        let mut store = ConversationStore::new("u1");
        store.append_local("c1".to_string(), 1, "hello".to_string(), 150);

        store.resolve_send(1, &SendOutcome::Failed { reason: "timeout".to_string() });
        assert_eq!(
            store.conversation("c1").unwrap().messages()[0].delivery,
            Delivery::Failed
        );

        store.retry_pending(1);
        assert_eq!(
            store.conversation("c1").unwrap().messages()[0].delivery,
            Delivery::Pending
        );
    }

    #[test]
    fn resync_replaces_rather_than_merges() {
        use hirewire_proto::payloads::chat::ConversationHistory;

        let mut store = ConversationStore::new("u1");
        store.append_message(wire("stale", "old", "u2", 50, 1));

        store.replace_all(ResyncState {
            conversations: vec![ConversationHistory {
                summary: ConversationSummary {
                    unread_count: Some(4),
                    ..ConversationSummary::new("c1")
                },
                messages: vec![wire("m1", "c1", "u2", 100, 1)],
            }],
        });

        assert!(store.conversation("old").is_none());
        let conversation = store.conversation("c1").unwrap();
        assert_eq!(conversation.unread_count(), 4);
        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(store.total_unread(), 4);
    }

    #[test]
    fn resync_keeps_the_focused_conversation_read() {
        use hirewire_proto::payloads::chat::ConversationHistory;

        let mut store = ConversationStore::new("u1");
        store.set_focused(Some("c1".to_string()));

        store.replace_all(ResyncState {
            conversations: vec![ConversationHistory {
                summary: ConversationSummary {
                    unread_count: Some(7),
                    ..ConversationSummary::new("c1")
                },
                messages: vec![],
            }],
        });

        assert_eq!(store.total_unread(), 0);
        assert_eq!(store.focused(), Some("c1"));
    }

    #[test]
    fn presence_tracks_online_set() {
        let mut store = ConversationStore::new("u1");
        store.presence_changed("u2".to_string(), true);
        assert!(store.is_online("u2"));

        store.presence_changed("u2".to_string(), false);
        assert!(!store.is_online("u2"));
    }
}
