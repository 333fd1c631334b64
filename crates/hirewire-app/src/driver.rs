//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration - the same orchestration code runs in production and in
//! deterministic simulation.
//!
//! # Implementations
//!
//! - **Production**: a UI shell plus a concrete transport binding
//!   (WebSocket, streaming, long-poll) feeding [`TransportEvent`]s
//! - **Simulation**: the harness driver with injectable envelopes and
//!   scripted transport failures

use std::future::Future;

use hirewire_proto::Envelope;

use crate::{App, AppAction};

/// Transport-side occurrences the driver reports to the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The physical channel is established.
    Up,
    /// The physical channel failed or dropped.
    Down {
        /// Driver-supplied reason.
        reason: String,
    },
    /// An envelope arrived from the server.
    Envelope(Envelope),
}

/// Abstracts I/O operations for the application runtime.
pub trait Driver {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Poll for the next batch of UI actions.
    ///
    /// The driver translates its input source (key presses, button taps,
    /// injected test scripts) into [`AppAction`]s, consulting the [`App`]
    /// for current state where needed. Returns an empty vector when no
    /// input is ready.
    fn poll_action(
        &mut self,
        app: &mut App,
    ) -> impl Future<Output = Result<Vec<AppAction>, Self::Error>>;

    /// Poll for the next transport event, or `None` when nothing is ready.
    fn poll_transport(&mut self) -> impl Future<Output = Option<TransportEvent>>;

    /// Open the physical channel. Completion is reported asynchronously via
    /// [`TransportEvent::Up`] or [`TransportEvent::Down`].
    fn start_transport(&mut self) -> impl Future<Output = Result<(), Self::Error>>;

    /// Close the physical channel.
    fn close_transport(&mut self, reason: &str);

    /// Write an envelope to the channel.
    fn send_envelope(&mut self, envelope: Envelope)
    -> impl Future<Output = Result<(), Self::Error>>;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;

    /// Whether the runtime loop should end (test scripts exhausted, user
    /// quit).
    fn should_stop(&self) -> bool;

    /// Stop the driver and clean up resources.
    fn stop(&mut self);
}
