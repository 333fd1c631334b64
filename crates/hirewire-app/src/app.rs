//! Application state machine.
//!
//! [`App`] manages the interactive state of the messaging subsystem,
//! completely decoupled from I/O and connection mechanics. It is a pure
//! state machine: it consumes [`crate::AppEvent`] inputs and produces
//! [`crate::AppAction`] instructions for the runtime to execute.
//!
//! # Responsibilities
//!
//! - Owns the conversation store and the dispatcher/aggregator pair.
//! - Tracks channel status for UI feedback.
//! - Exposes the outbound operations UI collaborators call: send, retry,
//!   mark read, focus, unread total.

use hirewire_proto::ConversationId;

use crate::{
    AppAction, AppEvent,
    dispatcher::Dispatcher,
    state::{Badge, ChannelStatus, Delivery},
    store::ConversationStore,
};

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies - fully testable in simulation.
pub struct App {
    /// Channel status as last reported by the connection layer.
    status: ChannelStatus,
    /// Conversation cache for this session.
    store: ConversationStore,
    /// Event application plus unread aggregation.
    dispatcher: Dispatcher,
    /// Transient status line. `None` if no message.
    status_message: Option<String>,
}

impl App {
    /// Create an App for a session user.
    #[must_use]
    pub fn new(self_user: impl Into<String>) -> Self {
        Self {
            status: ChannelStatus::Disconnected,
            store: ConversationStore::new(self_user),
            dispatcher: Dispatcher::new(),
            status_message: None,
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Tick => vec![],
            AppEvent::Connecting => {
                self.status = ChannelStatus::Connecting;
                vec![AppAction::Render]
            },
            AppEvent::Connected => {
                self.status = ChannelStatus::Connected;
                self.status_message = None;
                vec![AppAction::Render]
            },
            AppEvent::Disconnected { reason } => {
                self.status = ChannelStatus::Disconnected;
                self.status_message = Some(format!("Disconnected: {reason}"));
                vec![AppAction::Render]
            },
            AppEvent::ConnectError { reason } => {
                self.status = ChannelStatus::Disconnected;
                // Credential rejections are the one user-actionable failure.
                self.status_message = Some(format!("Connection failed: {reason}"));
                vec![AppAction::Render]
            },
            AppEvent::EventReceived(event) => {
                self.dispatcher.dispatch(&mut self.store, event);
                vec![AppAction::Render]
            },
            AppEvent::MessageQueued { conversation_id, local_seq, body, sent_at } => {
                self.store.append_local(conversation_id, local_seq, body, sent_at);
                self.dispatcher.observe(&self.store);
                vec![AppAction::Render]
            },
            AppEvent::MessageRetrying { local_seq } => {
                self.store.retry_pending(local_seq);
                vec![AppAction::Render]
            },
            AppEvent::SendResolved { local_seq, outcome } => {
                self.store.resolve_send(local_seq, &outcome);
                self.dispatcher.observe(&self.store);
                vec![AppAction::Render]
            },
        }
    }

    /// Open the session connection.
    pub fn connect(&mut self, user_id: impl Into<String>, token: impl Into<String>) -> Vec<AppAction> {
        self.status = ChannelStatus::Connecting;
        vec![
            AppAction::Connect { user_id: user_id.into(), token: token.into() },
            AppAction::Render,
        ]
    }

    /// Tear the session connection down.
    pub fn disconnect(&self) -> Vec<AppAction> {
        vec![AppAction::Disconnect, AppAction::Render]
    }

    /// Send a message to a conversation.
    pub fn send_message(
        &self,
        conversation_id: impl Into<ConversationId>,
        body: impl Into<String>,
        sent_at: i64,
    ) -> Vec<AppAction> {
        vec![
            AppAction::SendMessage {
                conversation_id: conversation_id.into(),
                body: body.into(),
                sent_at,
            },
            AppAction::Render,
        ]
    }

    /// Retry a failed send. No-op when the sequence number does not name a
    /// failed message of this session.
    pub fn retry_message(&self, conversation_id: &str, local_seq: u64) -> Vec<AppAction> {
        let Some(conversation) = self.store.conversation(conversation_id) else {
            return vec![];
        };
        let failed = conversation
            .messages()
            .iter()
            .find(|m| {
                m.local_seq == local_seq
                    && m.sender_id == self.store.self_user()
                    && m.delivery == Delivery::Failed
            });
        let Some(message) = failed else {
            return vec![];
        };

        vec![
            AppAction::RetryMessage {
                conversation_id: conversation_id.to_string(),
                local_seq,
                body: message.body.clone(),
                sent_at: message.sent_at,
            },
            AppAction::Render,
        ]
    }

    /// Mark a conversation read, locally and on the server.
    pub fn mark_read(&mut self, conversation_id: &str) -> Vec<AppAction> {
        self.store.mark_read(conversation_id);
        self.dispatcher.observe(&self.store);
        vec![
            AppAction::MarkRead { conversation_id: conversation_id.to_string() },
            AppAction::Render,
        ]
    }

    /// Track which conversation is open in the UI. Focusing marks it read.
    pub fn focus_conversation(&mut self, conversation_id: Option<ConversationId>) -> Vec<AppAction> {
        let notify = conversation_id
            .as_ref()
            .is_some_and(|id| self.store.conversation(id).is_some_and(|c| c.unread_count() > 0));

        self.store.set_focused(conversation_id.clone());
        self.dispatcher.observe(&self.store);

        let mut actions = Vec::new();
        if notify && let Some(id) = conversation_id {
            actions.push(AppAction::MarkRead { conversation_id: id });
        }
        actions.push(AppAction::Render);
        actions
    }

    /// Exact unread total across all conversations.
    #[must_use]
    pub fn total_unread(&self) -> u64 {
        self.store.total_unread()
    }

    /// Subscribe to edge-triggered badge updates.
    pub fn subscribe_badge(
        &self,
        callback: impl FnMut(&Badge) + 'static,
    ) -> hirewire_core::Subscription {
        self.dispatcher.aggregator().subscribe(callback)
    }

    /// Whether the realtime channel is live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status == ChannelStatus::Connected
    }

    /// Current channel status.
    #[must_use]
    pub fn status(&self) -> ChannelStatus {
        self.status
    }

    /// The conversation store (read-only fan-out for UI collaborators).
    #[must_use]
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Transient status line. `None` if no message.
    #[must_use]
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }
}
