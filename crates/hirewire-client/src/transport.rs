//! Transport contract.
//!
//! The subsystem does not prescribe a network protocol. This module defines
//! the contract any transport must satisfy - a pair of envelope channels in
//! each direction - and provides an in-memory implementation of it for tests
//! and harnesses. Production bindings (WebSocket, streaming, long-poll) live
//! outside this crate and only need to produce the same channel surface.

use hirewire_proto::Envelope;
use thiserror::Error;
use tokio::sync::mpsc;

/// Default bound for the in-memory channel pair.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer endpoint is gone.
    #[error("channel closed: {0}")]
    Closed(String),
}

/// Client side of an established channel.
///
/// Frames are sent and received via the channels; whatever I/O feeds them is
/// the binding's concern, not the protocol's.
pub struct ClientChannel {
    /// Envelopes to the server.
    pub to_server: mpsc::Sender<Envelope>,
    /// Envelopes from the server.
    pub from_server: mpsc::Receiver<Envelope>,
}

impl ClientChannel {
    /// Send an envelope to the server.
    ///
    /// # Errors
    ///
    /// - `TransportError::Closed` if the server side is gone
    pub async fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.to_server
            .send(envelope)
            .await
            .map_err(|e| TransportError::Closed(e.to_string()))
    }

    /// Receive the next envelope from the server. `None` when the server
    /// side is gone.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.from_server.recv().await
    }
}

/// Server side of an established channel. Used by test harnesses acting as
/// the messaging server.
pub struct ServerChannel {
    /// Envelopes to the client.
    pub to_client: mpsc::Sender<Envelope>,
    /// Envelopes from the client.
    pub from_client: mpsc::Receiver<Envelope>,
}

impl ServerChannel {
    /// Send an envelope to the client.
    ///
    /// # Errors
    ///
    /// - `TransportError::Closed` if the client side is gone
    pub async fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.to_client
            .send(envelope)
            .await
            .map_err(|e| TransportError::Closed(e.to_string()))
    }

    /// Receive the next envelope from the client. `None` when the client
    /// side is gone.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.from_client.recv().await
    }
}

/// Create a connected in-memory channel pair.
#[must_use]
pub fn duplex(capacity: usize) -> (ClientChannel, ServerChannel) {
    let (to_server, from_client) = mpsc::channel(capacity);
    let (to_client, from_server) = mpsc::channel(capacity);

    (
        ClientChannel { to_server, from_server },
        ServerChannel { to_client, from_client },
    )
}
