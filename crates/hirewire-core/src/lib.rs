//! Core
//!
//! Foundation for the Hirewire realtime messaging subsystem: the connection
//! lifecycle state machine, the environment abstraction for deterministic
//! testing, and the typed signal fan-out.
//!
//! # Architecture
//!
//! Everything here follows the Sans-IO and Action-Based patterns: state
//! machines take time as input, mutate internal state, and return actions for
//! a driver to execute. No clocks, no sockets, no threads.
//!
//! # Components
//!
//! - [`Connection`]: connection lifecycle (handshake, bounded reconnect,
//!   heartbeats, teardown)
//! - [`Environment`]: time/randomness abstraction for virtual-time tests
//! - [`SignalHub`]: multi-subscriber signal fan-out with disposable handles
//! - [`ConnectionError`]: error taxonomy split along the retry boundary

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod connection;
pub mod env;
mod error;
pub mod signal;

pub use connection::{
    Connection, ConnectionAction, ConnectionConfig, ConnectionState, Lifecycle,
};
pub use env::Environment;
pub use error::ConnectionError;
pub use signal::{SignalHub, Subscription};
