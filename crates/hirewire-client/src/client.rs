//! Client state machine.
//!
//! The `Client` wraps the connection lifecycle machine with everything a
//! session needs on top of it: envelope decoding and routing, outbound send
//! tracking, and resync sequencing. Like the layers below it, the client is
//! Sans-IO: it consumes [`ClientEvent`]s, mutates internal state, and returns
//! [`ClientAction`]s for the caller to execute.
//!
//! # Inbound routing
//!
//! Envelopes are decoded exactly once, here. Unknown event names are ignored
//! (debug-logged); malformed payloads are dropped with a warning and never
//! reach the store. Session events (handshake replies, keepalives) feed the
//! connection machine; domain events are delivered to the caller only while
//! the handshake has been accepted.

use std::time::Duration;

use hirewire_core::{
    Connection, ConnectionAction, ConnectionConfig, ConnectionError, ConnectionState, Environment,
};
use hirewire_proto::{
    Envelope, ServerEvent,
    payloads::{
        ClientCommand,
        chat::{MarkRead, SendMessage},
        session::AuthRequest,
    },
};

use crate::{
    event::{ClientAction, ClientEvent, SendOutcome},
    send_tracker::SendTracker,
};

/// Time an outbound message may wait for its acknowledgment before it is
/// surfaced as failed.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Connection lifecycle configuration (reconnect budget, delays,
    /// timeouts).
    pub connection: ConnectionConfig,
    /// Ack deadline for outbound messages.
    pub ack_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { connection: ConnectionConfig::default(), ack_timeout: DEFAULT_ACK_TIMEOUT }
    }
}

/// Session client: connection lifecycle plus send tracking and routing.
///
/// Generic over [`Environment`] so the same logic runs against the system
/// clock in production and virtual time in simulation.
pub struct Client<E: Environment> {
    env: E,
    connection: Connection<E::Instant>,
    tracker: SendTracker<E::Instant>,
}

impl<E: Environment> Client<E> {
    /// Create a client holding the session credential.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::MissingCredential` if the token is empty
    pub fn new(env: E, credential: AuthRequest, config: ClientConfig) -> Result<Self, ConnectionError> {
        let now = env.now();
        Ok(Self {
            connection: Connection::new(credential, config.connection, now)?,
            tracker: SendTracker::new(config.ack_timeout),
            env,
        })
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Whether the handshake has been accepted and domain events flow.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Session ID from the last accepted handshake.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.connection.session_id()
    }

    /// User the session credential belongs to.
    #[must_use]
    pub fn user_id(&self) -> &str {
        self.connection.user_id()
    }

    /// Begin establishing the channel.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if already opened
    pub fn open(&mut self) -> Result<Vec<ClientAction>, ConnectionError> {
        let now = self.env.now();
        Ok(map_connection_actions(self.connection.open(now)?))
    }

    /// Tear the session down: cancel timers, fail in-flight sends.
    pub fn close(&mut self) -> Vec<ClientAction> {
        let mut actions = map_connection_actions(self.connection.close());
        actions.extend(self.fail_pending("connection closed"));
        actions
    }

    /// Process an event and return the actions it caused.
    pub fn handle(&mut self, event: ClientEvent) -> Vec<ClientAction> {
        match event {
            ClientEvent::TransportUp => {
                let now = self.env.now();
                match self.connection.transport_up(now) {
                    Ok(actions) => map_connection_actions(actions),
                    Err(err) => {
                        tracing::warn!(%err, "failed to start handshake");
                        vec![]
                    },
                }
            },
            ClientEvent::TransportLost { reason } => {
                let now = self.env.now();
                let mut actions =
                    map_connection_actions(self.connection.transport_lost(&reason, now));
                actions.extend(self.fail_pending("connection lost"));
                actions
            },
            ClientEvent::EnvelopeReceived(envelope) => self.handle_envelope(&envelope),
            ClientEvent::Tick => {
                let now = self.env.now();
                let mut actions = map_connection_actions(self.connection.tick(now));
                for send in self.tracker.expired(now) {
                    tracing::warn!(local_seq = send.local_seq, "send timed out awaiting ack");
                    actions.push(ClientAction::SendResolved {
                        local_seq: send.local_seq,
                        outcome: SendOutcome::Failed {
                            reason: "acknowledgment timeout".to_string(),
                        },
                    });
                }
                actions
            },
            ClientEvent::SendMessage { conversation_id, body, sent_at } => {
                self.send_message(conversation_id, body, sent_at)
            },
            ClientEvent::RetryMessage { conversation_id, local_seq, body, sent_at } => {
                self.retry_message(conversation_id, local_seq, body, sent_at)
            },
            ClientEvent::MarkRead { conversation_id } => {
                if !self.connection.is_connected() {
                    // Local mark-read still applies in the store; the server
                    // learns the truth from the next resync.
                    return vec![];
                }
                encode_command(ClientCommand::MarkRead(MarkRead { conversation_id }))
                    .map(ClientAction::Send)
                    .into_iter()
                    .collect()
            },
            ClientEvent::RequestResync => {
                if !self.connection.is_connected() {
                    return vec![];
                }
                encode_command(ClientCommand::ResyncRequest)
                    .map(ClientAction::Send)
                    .into_iter()
                    .collect()
            },
        }
    }

    fn send_message(
        &mut self,
        conversation_id: String,
        body: String,
        sent_at: i64,
    ) -> Vec<ClientAction> {
        let local_seq = self.tracker.assign_seq();
        let mut actions = vec![ClientAction::SendQueued {
            conversation_id: conversation_id.clone(),
            local_seq,
            body: body.clone(),
            sent_at,
        }];

        if self.connection.is_connected() {
            let now = self.env.now();
            self.tracker.track(local_seq, conversation_id.clone(), body.clone(), sent_at, now);
            if let Some(envelope) = encode_command(ClientCommand::Send(SendMessage {
                conversation_id,
                body,
                local_seq,
                sent_at,
            })) {
                actions.push(ClientAction::Send(envelope));
            }
        } else {
            actions.push(ClientAction::SendResolved {
                local_seq,
                outcome: SendOutcome::Failed { reason: "not connected".to_string() },
            });
        }

        actions
    }

    fn retry_message(
        &mut self,
        conversation_id: String,
        local_seq: u64,
        body: String,
        sent_at: i64,
    ) -> Vec<ClientAction> {
        if !self.connection.is_connected() {
            return vec![ClientAction::SendResolved {
                local_seq,
                outcome: SendOutcome::Failed { reason: "not connected".to_string() },
            }];
        }

        let now = self.env.now();
        self.tracker.track(local_seq, conversation_id.clone(), body.clone(), sent_at, now);

        let mut actions = vec![ClientAction::SendRetrying { local_seq }];
        if let Some(envelope) = encode_command(ClientCommand::Send(SendMessage {
            conversation_id,
            body,
            local_seq,
            sent_at,
        })) {
            actions.push(ClientAction::Send(envelope));
        }
        actions
    }

    fn handle_envelope(&mut self, envelope: &Envelope) -> Vec<ClientAction> {
        let now = self.env.now();

        let event = match ServerEvent::decode(envelope) {
            Ok(Some(event)) => event,
            Ok(None) => {
                tracing::debug!(event = %envelope.event, "ignoring unknown event");
                return vec![];
            },
            Err(err) => {
                tracing::warn!(event = %envelope.event, %err, "dropping malformed event");
                return vec![];
            },
        };

        let mut actions = map_connection_actions(self.connection.handle_event(&event, now));

        match event {
            ServerEvent::AuthOk(_) | ServerEvent::AuthRejected(_) | ServerEvent::Pong => {},
            ServerEvent::MessageAck(ack) => match self.tracker.resolve(ack.local_seq) {
                Some(_) => actions.push(ClientAction::SendResolved {
                    local_seq: ack.local_seq,
                    outcome: SendOutcome::Acknowledged { id: ack.id, sent_at: ack.sent_at },
                }),
                None => {
                    tracing::debug!(local_seq = ack.local_seq, "ack for unknown send");
                },
            },
            ServerEvent::MessageNew(_)
            | ServerEvent::ConversationUpdated(_)
            | ServerEvent::PresenceChanged(_)
            | ServerEvent::Resync(_) => {
                if self.connection.is_connected() {
                    actions.push(ClientAction::Deliver(event));
                } else {
                    tracing::debug!(
                        event = %envelope.event,
                        "dropping domain event outside connected state"
                    );
                }
            },
        }

        actions
    }

    fn fail_pending(&mut self, reason: &str) -> Vec<ClientAction> {
        self.tracker
            .drain_all()
            .into_iter()
            .map(|send| ClientAction::SendResolved {
                local_seq: send.local_seq,
                outcome: SendOutcome::Failed { reason: reason.to_string() },
            })
            .collect()
    }
}

/// Lift connection actions into client actions. `RequestResync` becomes the
/// actual resync envelope here, so callers only ever see transport-level
/// instructions.
fn map_connection_actions(actions: Vec<ConnectionAction>) -> Vec<ClientAction> {
    let mut out = Vec::with_capacity(actions.len());
    for action in actions {
        match action {
            ConnectionAction::StartTransport => out.push(ClientAction::StartTransport),
            ConnectionAction::Send(envelope) => out.push(ClientAction::Send(envelope)),
            ConnectionAction::CloseTransport { reason } => {
                out.push(ClientAction::CloseTransport { reason });
            },
            ConnectionAction::RequestResync => {
                if let Some(envelope) = encode_command(ClientCommand::ResyncRequest) {
                    out.push(ClientAction::Send(envelope));
                }
            },
            ConnectionAction::Notify(signal) => out.push(ClientAction::Notify(signal)),
        }
    }
    out
}

fn encode_command(command: ClientCommand) -> Option<Envelope> {
    match command.into_envelope() {
        Ok(envelope) => Some(envelope),
        Err(err) => {
            tracing::warn!(%err, "failed to encode outbound command");
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use hirewire_core::Lifecycle;
    use hirewire_proto::payloads::{
        chat::MessageAck,
        session::{AuthOk, AuthRejected},
    };
    use serde_json::json;

    use super::*;

    #[derive(Clone)]
    struct TestEnv;

    impl Environment for TestEnv {
        type Instant = Instant;

        fn now(&self) -> Instant {
            Instant::now()
        }

        fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            async {}
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = i as u8;
            }
        }
    }

    fn new_client() -> Client<TestEnv> {
        Client::new(TestEnv, AuthRequest::new("u1", "tok1"), ClientConfig::default()).unwrap()
    }

    fn connect(client: &mut Client<TestEnv>) {
        client.open().unwrap();
        client.handle(ClientEvent::TransportUp);
        let envelope = ServerEvent::AuthOk(AuthOk { session_id: "s1".to_string() })
            .into_envelope()
            .unwrap();
        let actions = client.handle(ClientEvent::EnvelopeReceived(envelope));
        assert!(actions.contains(&ClientAction::Notify(Lifecycle::Connect)));
    }

    #[test]
    fn accepted_handshake_requests_a_resync() {
        let mut client = new_client();
        client.open().unwrap();
        client.handle(ClientEvent::TransportUp);

        let envelope = ServerEvent::AuthOk(AuthOk { session_id: "s1".to_string() })
            .into_envelope()
            .unwrap();
        let actions = client.handle(ClientEvent::EnvelopeReceived(envelope));

        assert!(client.is_connected());
        assert!(actions.iter().any(|a| matches!(
            a,
            ClientAction::Send(envelope) if envelope.event == "resync:request"
        )));
    }

    #[test]
    fn rejected_handshake_surfaces_connect_error() {
        let mut client = new_client();
        client.open().unwrap();
        client.handle(ClientEvent::TransportUp);

        let envelope =
            ServerEvent::AuthRejected(AuthRejected { reason: "token revoked".to_string() })
                .into_envelope()
                .unwrap();
        let actions = client.handle(ClientEvent::EnvelopeReceived(envelope));

        assert!(!client.is_connected());
        assert!(actions.iter().any(|a| matches!(
            a,
            ClientAction::Notify(Lifecycle::ConnectError { reason }) if reason == "token revoked"
        )));
    }

    #[test]
    fn send_while_connected_is_tracked_until_ack() {
        let mut client = new_client();
        connect(&mut client);

        let actions = client.handle(ClientEvent::SendMessage {
            conversation_id: "c1".to_string(),
            body: "hello".to_string(),
            sent_at: 100,
        });

        let local_seq = actions
            .iter()
            .find_map(|a| match a {
                ClientAction::SendQueued { local_seq, .. } => Some(*local_seq),
                _ => None,
            })
            .unwrap();
        assert!(actions.iter().any(|a| matches!(
            a,
            ClientAction::Send(envelope) if envelope.event == "message:send"
        )));

        let ack = ServerEvent::MessageAck(MessageAck {
            local_seq,
            id: "m9".to_string(),
            sent_at: 105,
        })
        .into_envelope()
        .unwrap();
        let actions = client.handle(ClientEvent::EnvelopeReceived(ack));

        assert!(actions.iter().any(|a| matches!(
            a,
            ClientAction::SendResolved {
                local_seq: seq,
                outcome: SendOutcome::Acknowledged { id, .. },
            } if *seq == local_seq && id == "m9"
        )));
    }

    #[test]
    fn send_while_disconnected_fails_immediately() {
        let mut client = new_client();

        let actions = client.handle(ClientEvent::SendMessage {
            conversation_id: "c1".to_string(),
            body: "hello".to_string(),
            sent_at: 100,
        });

        assert!(actions.iter().any(|a| matches!(a, ClientAction::SendQueued { .. })));
        assert!(actions.iter().any(|a| matches!(
            a,
            ClientAction::SendResolved { outcome: SendOutcome::Failed { .. }, .. }
        )));
        // Nothing is written to the wire.
        assert!(!actions.iter().any(|a| matches!(a, ClientAction::Send(_))));
    }

    #[test]
    fn transport_loss_fails_in_flight_sends() {
        let mut client = new_client();
        connect(&mut client);

        client.handle(ClientEvent::SendMessage {
            conversation_id: "c1".to_string(),
            body: "hello".to_string(),
            sent_at: 100,
        });

        let actions =
            client.handle(ClientEvent::TransportLost { reason: "connection reset".to_string() });

        assert!(actions.iter().any(|a| matches!(
            a,
            ClientAction::SendResolved { outcome: SendOutcome::Failed { reason }, .. }
                if reason == "connection lost"
        )));
    }

    #[test]
    fn malformed_envelope_is_dropped() {
        let mut client = new_client();
        connect(&mut client);

        // message:new without a conversationId
        let envelope = Envelope::new("message:new", json!({"id": "m1", "body": "hi"}));
        let actions = client.handle(ClientEvent::EnvelopeReceived(envelope));

        assert!(actions.is_empty());
        assert!(client.is_connected());
    }

    #[test]
    fn unknown_event_is_ignored() {
        let mut client = new_client();
        connect(&mut client);

        let envelope = Envelope::new("typing:started", json!({"conversationId": "c1"}));
        let actions = client.handle(ClientEvent::EnvelopeReceived(envelope));

        assert!(actions.is_empty());
    }

    #[test]
    fn domain_events_are_delivered_only_while_connected() {
        let mut client = new_client();

        let message = ServerEvent::MessageNew(hirewire_proto::payloads::chat::WireMessage {
            id: "m1".to_string(),
            conversation_id: "c1".to_string(),
            sender_id: "u2".to_string(),
            body: "hello".to_string(),
            sent_at: 100,
            seq: 1,
        });

        // Not connected: dropped.
        let envelope = message.clone().into_envelope().unwrap();
        let actions = client.handle(ClientEvent::EnvelopeReceived(envelope));
        assert!(actions.is_empty());

        // Connected: delivered.
        connect(&mut client);
        let envelope = message.into_envelope().unwrap();
        let actions = client.handle(ClientEvent::EnvelopeReceived(envelope));
        assert!(actions.iter().any(|a| matches!(a, ClientAction::Deliver(_))));
    }

    #[test]
    fn close_fails_in_flight_sends_and_is_terminal() {
        let mut client = new_client();
        connect(&mut client);
        client.handle(ClientEvent::SendMessage {
            conversation_id: "c1".to_string(),
            body: "hello".to_string(),
            sent_at: 100,
        });

        let actions = client.close();
        assert!(actions.iter().any(|a| matches!(a, ClientAction::CloseTransport { .. })));
        assert!(actions.iter().any(|a| matches!(
            a,
            ClientAction::SendResolved { outcome: SendOutcome::Failed { .. }, .. }
        )));
        assert_eq!(client.state(), ConnectionState::Closed);
    }
}
