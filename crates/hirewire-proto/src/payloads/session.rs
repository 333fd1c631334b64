//! Session management payloads.
//!
//! The first envelope on every fresh channel is `auth`; the server answers
//! with `auth:ok` or `auth:error` before any domain event flows. A reconnect
//! replays the same credential — the server may have discarded all prior
//! session state, so acceptance is followed by a full resync rather than a
//! delta.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// Transport kinds a client may list in its handshake, most preferred first.
pub const DEFAULT_TRANSPORTS: [&str; 2] = ["stream", "poll"];

/// Credentialed handshake, sent by the client as the first envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    /// Authenticated user this channel belongs to.
    pub user_id: UserId,

    /// Opaque bearer token issued by the auth layer.
    pub token: String,

    /// Preferred transport ordering, most preferred first.
    #[serde(default)]
    pub transports: Vec<String>,
}

impl AuthRequest {
    /// Create a handshake with the default transport preference.
    #[must_use]
    pub fn new(user_id: impl Into<UserId>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
            transports: DEFAULT_TRANSPORTS.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Server acceptance of a handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthOk {
    /// Server-assigned session identifier. Informational only; the client
    /// never assumes the id survives a reconnect.
    pub session_id: String,
}

/// Server rejection of a handshake. Non-retryable: the credential is missing,
/// expired, or revoked, and the user must sign in again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRejected {
    /// Human-readable rejection reason.
    pub reason: String,
}
