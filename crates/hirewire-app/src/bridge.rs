//! Connection-to-Application translation layer.
//!
//! The [`Bridge`] wraps the [`ConnectionManager`] and adapts it to the
//! application lifecycle:
//!
//! - Converts high-level [`crate::AppAction`]s into client events.
//! - Accumulates outgoing envelopes and transport operations for the driver
//!   to execute in the next I/O cycle.
//! - Interprets client actions back into [`crate::AppEvent`]s that update
//!   the store and the UI.

use hirewire_client::{
    ClientAction, ClientConfig, ClientEvent, ConnectionId, ConnectionManager, Environment,
    Lifecycle,
};
use hirewire_proto::Envelope;

use crate::{AppAction, AppEvent};

/// Transport-level instructions for the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOp {
    /// Open the physical channel.
    Start,
    /// Close the physical channel.
    Close {
        /// Reason for closing.
        reason: String,
    },
}

/// Bridge between App and the connection layer.
///
/// Generic over [`Environment`] to support both production and simulation.
pub struct Bridge<E: Environment> {
    manager: ConnectionManager<E>,
    outgoing: Vec<Envelope>,
    transport_ops: Vec<TransportOp>,
}

impl<E: Environment> Bridge<E> {
    /// Create a bridge owning a fresh connection manager.
    pub fn new(env: E, config: ClientConfig) -> Self {
        Self {
            manager: ConnectionManager::new(env, config),
            outgoing: Vec::new(),
            transport_ops: Vec::new(),
        }
    }

    /// The connection manager. Use for lifecycle signal subscriptions and
    /// `open`/`close`/`current` queries.
    pub fn manager(&self) -> &ConnectionManager<E> {
        &self.manager
    }

    /// Id of the session connection, if one exists.
    #[must_use]
    pub fn current_connection(&self) -> Option<ConnectionId> {
        self.manager.current()
    }

    /// Whether the realtime channel is live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    /// Process an App action and return resulting App events.
    pub fn process_app_action(&mut self, action: AppAction) -> Vec<AppEvent> {
        match action {
            AppAction::Connect { user_id, token } => {
                match self.manager.open(user_id, token) {
                    Ok((_, actions)) => self.process_client_actions(actions),
                    Err(err) => vec![AppEvent::ConnectError { reason: err.to_string() }],
                }
            },
            AppAction::Disconnect => {
                let actions = self.manager.close();
                self.process_client_actions(actions)
            },
            AppAction::SendMessage { conversation_id, body, sent_at } => {
                let actions = self
                    .manager
                    .handle(ClientEvent::SendMessage { conversation_id, body, sent_at });
                self.process_client_actions(actions)
            },
            AppAction::RetryMessage { conversation_id, local_seq, body, sent_at } => {
                let actions = self.manager.handle(ClientEvent::RetryMessage {
                    conversation_id,
                    local_seq,
                    body,
                    sent_at,
                });
                self.process_client_actions(actions)
            },
            AppAction::MarkRead { conversation_id } => {
                let actions = self.manager.handle(ClientEvent::MarkRead { conversation_id });
                self.process_client_actions(actions)
            },
            AppAction::RequestResync => {
                let actions = self.manager.handle(ClientEvent::RequestResync);
                self.process_client_actions(actions)
            },
            AppAction::Render => vec![],
        }
    }

    /// The driver established the physical channel.
    pub fn handle_transport_up(&mut self) -> Vec<AppEvent> {
        let actions = self.manager.handle(ClientEvent::TransportUp);
        self.process_client_actions(actions)
    }

    /// The driver lost the physical channel.
    pub fn handle_transport_lost(&mut self, reason: &str) -> Vec<AppEvent> {
        let actions =
            self.manager.handle(ClientEvent::TransportLost { reason: reason.to_string() });
        self.process_client_actions(actions)
    }

    /// An envelope arrived from the server.
    pub fn handle_envelope(&mut self, envelope: Envelope) -> Vec<AppEvent> {
        let actions = self.manager.handle(ClientEvent::EnvelopeReceived(envelope));
        self.process_client_actions(actions)
    }

    /// Process a time tick (retry deadlines, ack timeouts, heartbeats).
    pub fn handle_tick(&mut self) -> Vec<AppEvent> {
        let actions = self.manager.handle(ClientEvent::Tick);
        self.process_client_actions(actions)
    }

    /// Take pending outgoing envelopes.
    pub fn take_outgoing(&mut self) -> Vec<Envelope> {
        std::mem::take(&mut self.outgoing)
    }

    /// Take pending transport operations.
    pub fn take_transport_ops(&mut self) -> Vec<TransportOp> {
        std::mem::take(&mut self.transport_ops)
    }

    fn process_client_actions(&mut self, actions: Vec<ClientAction>) -> Vec<AppEvent> {
        let mut events = Vec::new();

        for action in actions {
            match action {
                ClientAction::StartTransport => {
                    self.transport_ops.push(TransportOp::Start);
                },
                ClientAction::Send(envelope) => {
                    self.outgoing.push(envelope);
                },
                ClientAction::CloseTransport { reason } => {
                    self.transport_ops.push(TransportOp::Close { reason });
                },
                ClientAction::Deliver(event) => {
                    events.push(AppEvent::EventReceived(event));
                },
                ClientAction::Notify(Lifecycle::Connect) => {
                    events.push(AppEvent::Connected);
                },
                ClientAction::Notify(Lifecycle::Disconnect { reason }) => {
                    events.push(AppEvent::Disconnected { reason });
                },
                ClientAction::Notify(Lifecycle::ConnectError { reason }) => {
                    events.push(AppEvent::ConnectError { reason });
                },
                ClientAction::SendQueued { conversation_id, local_seq, body, sent_at } => {
                    events.push(AppEvent::MessageQueued {
                        conversation_id,
                        local_seq,
                        body,
                        sent_at,
                    });
                },
                ClientAction::SendRetrying { local_seq } => {
                    events.push(AppEvent::MessageRetrying { local_seq });
                },
                ClientAction::SendResolved { local_seq, outcome } => {
                    events.push(AppEvent::SendResolved { local_seq, outcome });
                },
            }
        }

        events
    }
}
