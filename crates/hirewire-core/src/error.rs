//! Error types for the connection layer.
//!
//! Strongly-typed errors split along the retry boundary: credential problems
//! are fatal and end the connection, transport problems are transient and
//! feed the bounded reconnect policy, protocol problems are recovered locally
//! by dropping the offending event.

use std::{io, time::Duration};

use hirewire_proto::ProtocolError;
use thiserror::Error;

use crate::connection::ConnectionState;

/// Errors that can occur during connection state machine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// No credential was supplied; a connection attempt is never made.
    #[error("missing credential: cannot open a channel without a token")]
    MissingCredential,

    /// The server rejected the handshake credential. Non-retryable; the
    /// user must sign in again.
    #[error("handshake rejected: {reason}")]
    HandshakeRejected {
        /// Rejection reason from the server.
        reason: String,
    },

    /// Invalid state transition attempted.
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when the error occurred.
        state: ConnectionState,
        /// Operation that was attempted.
        operation: String,
    },

    /// Handshake did not complete within the configured timeout.
    #[error("handshake timeout after {elapsed:?}")]
    HandshakeTimeout {
        /// How long we waited.
        elapsed: Duration,
    },

    /// Connection idle timeout exceeded.
    #[error("idle timeout after {elapsed:?}")]
    IdleTimeout {
        /// How long the connection was idle.
        elapsed: Duration,
    },

    /// Underlying transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Wire encode/decode failure.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ConnectionError {
    /// Returns true if this error is transient and may succeed on retry.
    ///
    /// Transient errors feed the bounded reconnect policy. Credential
    /// rejections and protocol violations are never transient: retrying with
    /// the same input cannot succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::HandshakeTimeout { .. } | Self::IdleTimeout { .. } | Self::Transport(_)
        )
    }
}

/// Convert `ConnectionError` to `io::Error` for compatibility with async I/O
/// APIs.
///
/// This is only for boundary conversion - internally we use
/// `ConnectionError`.
impl From<ConnectionError> for io::Error {
    fn from(err: ConnectionError) -> Self {
        let kind = match &err {
            ConnectionError::HandshakeTimeout { .. } | ConnectionError::IdleTimeout { .. } => {
                io::ErrorKind::TimedOut
            },
            ConnectionError::MissingCredential | ConnectionError::HandshakeRejected { .. } => {
                io::ErrorKind::PermissionDenied
            },
            ConnectionError::InvalidState { .. } | ConnectionError::Protocol(_) => {
                io::ErrorKind::InvalidData
            },
            ConnectionError::Transport(_) => io::ErrorKind::Other,
        };
        Self::new(kind, err.to_string())
    }
}

/// Convert `io::Error` to `ConnectionError` (for transport errors).
impl From<io::Error> for ConnectionError {
    fn from(err: io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_class_errors_are_transient() {
        assert!(
            ConnectionError::HandshakeTimeout { elapsed: Duration::from_secs(11) }.is_transient()
        );
        assert!(ConnectionError::IdleTimeout { elapsed: Duration::from_secs(61) }.is_transient());
        assert!(ConnectionError::Transport("connection refused".to_string()).is_transient());
    }

    #[test]
    fn credential_errors_are_fatal() {
        assert!(!ConnectionError::MissingCredential.is_transient());
        assert!(
            !ConnectionError::HandshakeRejected { reason: "token expired".to_string() }
                .is_transient()
        );
    }

    #[test]
    fn protocol_errors_are_fatal() {
        let err = ConnectionError::Protocol(ProtocolError::Envelope("bad json".to_string()));
        assert!(!err.is_transient());
    }
}
