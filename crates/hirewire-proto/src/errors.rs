//! Protocol error types.
//!
//! Strongly-typed errors for envelope and payload handling. Decode failures
//! are recoverable by design: a malformed inbound event is dropped by the
//! receiving layer, never propagated to the UI.

use thiserror::Error;

/// Errors produced while encoding or decoding wire envelopes and payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The envelope itself could not be parsed as JSON.
    #[error("malformed envelope: {0}")]
    Envelope(String),

    /// A known event carried a payload that does not match its schema
    /// (missing or mistyped fields).
    #[error("malformed payload for {event}: {detail}")]
    Payload {
        /// Event name from the envelope.
        event: String,
        /// Deserializer diagnostic.
        detail: String,
    },

    /// Serialization of an outbound payload failed.
    #[error("encode failed for {event}: {detail}")]
    Encode {
        /// Event name being encoded.
        event: String,
        /// Serializer diagnostic.
        detail: String,
    },
}

impl ProtocolError {
    /// Returns true if this error came from inbound data (and should be
    /// dropped with a warning) rather than from local serialization.
    pub fn is_inbound(&self) -> bool {
        matches!(self, Self::Envelope(_) | Self::Payload { .. })
    }
}
