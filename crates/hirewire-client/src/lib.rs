//! Connection Manager
//!
//! Action-based connection management for the Hirewire realtime channel. A
//! session owns exactly one connection; this crate provides the state machine
//! that drives it and the manager that owns it.
//!
//! # Architecture
//!
//! The client follows the same Sans-IO and Action-Based patterns as
//! [`hirewire_core`]. It receives events ([`ClientEvent`]), processes them
//! through pure state machine logic, and returns actions ([`ClientAction`])
//! for the caller to execute.
//!
//! # Components
//!
//! - [`Client`]: session state machine (connection lifecycle + send tracking
//!   + inbound routing)
//! - [`ConnectionManager`]: session-scoped owner exposing `open`, `close`,
//!   `current`, and lifecycle signal fan-out
//! - [`ClientEvent`] / [`ClientAction`]: the event/action surface
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides the
//! channel-pair contract a concrete transport binding must satisfy, plus an
//! in-memory implementation for tests.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod event;
mod manager;
mod send_tracker;

#[cfg(feature = "transport")]
pub mod transport;

pub use client::{Client, ClientConfig, DEFAULT_ACK_TIMEOUT};
pub use event::{ClientAction, ClientEvent, SendOutcome};
pub use hirewire_core::{
    ConnectionConfig, ConnectionError, ConnectionState, Environment, Lifecycle, Subscription,
};
pub use manager::{ConnectionId, ConnectionManager};
