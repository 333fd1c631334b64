//! Wire contract
//!
//! Defines the envelope and typed payloads carried over the realtime channel
//! between a Hirewire client and the messaging server. The transport itself
//! (WebSocket, streaming, long-poll) is out of scope; anything that can move
//! [`Envelope`] values in both directions satisfies the contract.
//!
//! # Architecture
//!
//! - [`Envelope`]: transport-layer unit, a named event plus a JSON document
//! - [`ServerEvent`]: typed inbound events (decoded from envelopes)
//! - [`ClientCommand`]: typed outbound commands (encoded into envelopes)
//! - [`ProtocolError`]: decode/encode failures
//!
//! Unknown inbound event names are NOT errors; they decode to `None` so that
//! newer servers can ship events older clients ignore. Malformed payloads for
//! known events are errors, and the caller is expected to drop them.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod envelope;
mod errors;
pub mod payloads;

pub use envelope::Envelope;
pub use errors::ProtocolError;
pub use payloads::{ClientCommand, ServerEvent};

/// Stable identifier of a platform user (applicant or recruiter).
pub type UserId = String;

/// Stable identifier of a conversation thread.
pub type ConversationId = String;

/// Server-assigned identifier of a message.
///
/// Ids are opaque strings and carry no ordering; message ordering is always
/// by `(sent_at, local_seq)`.
pub type MessageId = String;
