//! Typed views over the JSON envelope.
//!
//! The envelope's `event` field selects the payload schema, so payloads carry
//! no variant tag of their own. [`ServerEvent`] covers everything the server
//! may push; [`ClientCommand`] covers everything the client may send.
//!
//! # Invariants
//!
//! - Event-name uniqueness: each variant maps to exactly one event name
//!   (enforced by match exhaustiveness in `event_name`, `decode`, and
//!   `into_envelope`).
//! - Round-trip consistency: encoding a value and decoding the resulting
//!   envelope produces an equivalent value.
//!
//! # Forward compatibility
//!
//! [`ServerEvent::decode`] returns `Ok(None)` for unknown event names rather
//! than an error. Ignoring what it cannot name lets an older client survive a
//! newer server. A *known* event with a payload that fails its schema is an
//! error, and the caller drops it.

pub mod chat;
pub mod session;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Envelope, errors::ProtocolError};

/// All events the server may push to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Handshake accepted; the channel is live.
    AuthOk(session::AuthOk),
    /// Handshake rejected; non-retryable.
    AuthRejected(session::AuthRejected),
    /// A message arrived in one of the session's conversations.
    MessageNew(chat::WireMessage),
    /// Conversation metadata changed.
    ConversationUpdated(chat::ConversationSummary),
    /// A participant went online or offline.
    PresenceChanged(chat::PresenceChange),
    /// An outbound send was accepted and assigned an id.
    MessageAck(chat::MessageAck),
    /// Full state snapshot superseding the client store.
    Resync(chat::ResyncState),
    /// Keepalive reply.
    Pong,
}

impl ServerEvent {
    /// Wire event name for this payload.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::AuthOk(_) => "auth:ok",
            Self::AuthRejected(_) => "auth:error",
            Self::MessageNew(_) => "message:new",
            Self::ConversationUpdated(_) => "conversation:updated",
            Self::PresenceChanged(_) => "presence:changed",
            Self::MessageAck(_) => "message:ack",
            Self::Resync(_) => "resync:state",
            Self::Pong => "pong",
        }
    }

    /// Decode a typed event from an envelope.
    ///
    /// Returns `Ok(None)` for event names this client does not know.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Payload` if a known event's payload fails its schema
    pub fn decode(envelope: &Envelope) -> Result<Option<Self>, ProtocolError> {
        let event = match envelope.event.as_str() {
            "auth:ok" => Self::AuthOk(decode_data(&envelope.event, &envelope.data)?),
            "auth:error" => Self::AuthRejected(decode_data(&envelope.event, &envelope.data)?),
            "message:new" => Self::MessageNew(decode_data(&envelope.event, &envelope.data)?),
            "conversation:updated" => {
                Self::ConversationUpdated(decode_data(&envelope.event, &envelope.data)?)
            },
            "presence:changed" => {
                Self::PresenceChanged(decode_data(&envelope.event, &envelope.data)?)
            },
            "message:ack" => Self::MessageAck(decode_data(&envelope.event, &envelope.data)?),
            "resync:state" => Self::Resync(decode_data(&envelope.event, &envelope.data)?),
            "pong" => Self::Pong,
            _ => return Ok(None),
        };

        Ok(Some(event))
    }

    /// Convert this event into a wire envelope.
    ///
    /// Used by servers and test harnesses; clients only decode.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Encode` if serialization fails
    pub fn into_envelope(self) -> Result<Envelope, ProtocolError> {
        let name = self.event_name();
        let data = match self {
            Self::AuthOk(inner) => encode_data(name, &inner)?,
            Self::AuthRejected(inner) => encode_data(name, &inner)?,
            Self::MessageNew(inner) => encode_data(name, &inner)?,
            Self::ConversationUpdated(inner) => encode_data(name, &inner)?,
            Self::PresenceChanged(inner) => encode_data(name, &inner)?,
            Self::MessageAck(inner) => encode_data(name, &inner)?,
            Self::Resync(inner) => encode_data(name, &inner)?,
            Self::Pong => Value::Null,
        };
        Ok(Envelope::new(name, data))
    }
}

/// All commands a client may send to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Credentialed handshake; first envelope on every fresh channel.
    Auth(session::AuthRequest),
    /// Send a message.
    Send(chat::SendMessage),
    /// Reset a conversation's unread count.
    MarkRead(chat::MarkRead),
    /// Request a full state snapshot.
    ResyncRequest,
    /// Keepalive probe.
    Ping,
}

impl ClientCommand {
    /// Wire event name for this command.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Send(_) => "message:send",
            Self::MarkRead(_) => "conversation:read",
            Self::ResyncRequest => "resync:request",
            Self::Ping => "ping",
        }
    }

    /// Convert this command into a wire envelope.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Encode` if serialization fails
    pub fn into_envelope(self) -> Result<Envelope, ProtocolError> {
        let name = self.event_name();
        let data = match self {
            Self::Auth(inner) => encode_data(name, &inner)?,
            Self::Send(inner) => encode_data(name, &inner)?,
            Self::MarkRead(inner) => encode_data(name, &inner)?,
            Self::ResyncRequest | Self::Ping => Value::Null,
        };
        Ok(Envelope::new(name, data))
    }

    /// Decode a typed command from an envelope.
    ///
    /// Used by servers and test harnesses to interpret captured client
    /// traffic. Returns `Ok(None)` for unknown event names.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Payload` if a known command's payload fails its
    ///   schema
    pub fn decode(envelope: &Envelope) -> Result<Option<Self>, ProtocolError> {
        let command = match envelope.event.as_str() {
            "auth" => Self::Auth(decode_data(&envelope.event, &envelope.data)?),
            "message:send" => Self::Send(decode_data(&envelope.event, &envelope.data)?),
            "conversation:read" => Self::MarkRead(decode_data(&envelope.event, &envelope.data)?),
            "resync:request" => Self::ResyncRequest,
            "ping" => Self::Ping,
            _ => return Ok(None),
        };

        Ok(Some(command))
    }
}

fn decode_data<T: DeserializeOwned>(event: &str, data: &Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data.clone()).map_err(|e| ProtocolError::Payload {
        event: event.to_string(),
        detail: e.to_string(),
    })
}

fn encode_data<T: Serialize>(event: &str, payload: &T) -> Result<Value, ProtocolError> {
    serde_json::to_value(payload).map_err(|e| ProtocolError::Encode {
        event: event.to_string(),
        detail: e.to_string(),
    })
}
