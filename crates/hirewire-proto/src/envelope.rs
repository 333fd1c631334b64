//! Event envelope.
//!
//! An [`Envelope`] is the transport-layer unit: a string event name plus an
//! arbitrary JSON document. This is a pure data holder; the typed views live
//! in [`crate::payloads`].
//!
//! The envelope is deliberately permissive: any JSON object with an `event`
//! field parses, and `data` defaults to `null` when absent. Schema validation
//! happens later, per event, so that an unknown event can be ignored without
//! ever inspecting its payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ProtocolError;

/// Transport-layer unit of the realtime channel.
///
/// Layout on the wire (JSON text):
/// `{"event": "<name>", "data": <payload>}`
///
/// # Invariants
///
/// - `event` is never empty for envelopes produced by this crate.
/// - `data` holds the payload exactly as received; no normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event name, e.g. `message:new`.
    pub event: String,

    /// Raw payload document. `null` when the event carries no payload.
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Create an envelope from an event name and payload document.
    #[must_use]
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self { event: event.into(), data }
    }

    /// Encode the envelope to JSON text.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Encode` if serialization fails (non-string map keys
    ///   in `data`; cannot happen for payloads built by this crate)
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode {
            event: self.event.clone(),
            detail: e.to_string(),
        })
    }

    /// Decode an envelope from JSON text.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Envelope` if the text is not a JSON object with an
    ///   `event` field
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Envelope(e.to_string()))
    }
}
