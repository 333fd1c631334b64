//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface a production frontend would, but
//! for deterministic testing: UI actions and transport events are injected
//! from the test script, outgoing envelopes are captured for assertion, and
//! transport establishment can be scripted to fail. It implements
//! [`Driver`] so the same [`hirewire_app::Runtime`] orchestration code runs
//! in both production and simulation.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};

use hirewire_app::{App, AppAction, Driver, TransportEvent};
use hirewire_proto::Envelope;

/// Error type for the simulation driver.
#[derive(Debug, Clone)]
pub struct SimDriverError(
    /// Diagnostic message.
    pub String,
);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// Shared state, so tests can keep an injection handle while the runtime
/// owns the driver.
#[derive(Default)]
struct SharedState {
    pending_actions: VecDeque<Vec<AppAction>>,
    transport_events: VecDeque<TransportEvent>,
    outgoing: Vec<Envelope>,
    transport_up: bool,
    fail_next_connects: u32,
    renders: usize,
    stopped: bool,
}

/// Poison-tolerant lock, matching the simulation environment.
fn lock(state: &Mutex<SharedState>) -> MutexGuard<'_, SharedState> {
    state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Simulation driver for deterministic testing.
///
/// The runtime loop ends once every injected script is drained (or
/// [`SimDriverHandle::stop`] is called), so `Runtime::run` terminates and
/// hands the final [`App`] back for inspection.
pub struct SimDriver {
    state: Arc<Mutex<SharedState>>,
}

impl Default for SimDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDriver {
    /// Create a driver with empty scripts.
    #[must_use]
    pub fn new() -> Self {
        Self { state: Arc::new(Mutex::new(SharedState::default())) }
    }

    /// An injection handle sharing this driver's state.
    #[must_use]
    pub fn handle(&self) -> SimDriverHandle {
        SimDriverHandle { state: Arc::clone(&self.state) }
    }
}

/// Injection and inspection handle for a [`SimDriver`].
#[derive(Clone)]
pub struct SimDriverHandle {
    state: Arc<Mutex<SharedState>>,
}

impl SimDriverHandle {
    /// Script a batch of UI actions for the next poll.
    pub fn inject_actions(&self, actions: Vec<AppAction>) {
        lock(&self.state).pending_actions.push_back(actions);
    }

    /// Script an idle cycle: the next action poll returns nothing, letting
    /// one queued transport event be processed first.
    pub fn inject_wait(&self) {
        lock(&self.state).pending_actions.push_back(Vec::new());
    }

    /// Inject an envelope from the simulated server.
    pub fn inject_envelope(&self, envelope: Envelope) {
        lock(&self.state).transport_events.push_back(TransportEvent::Envelope(envelope));
    }

    /// Inject an unexpected transport drop.
    pub fn inject_transport_down(&self, reason: &str) {
        let mut state = lock(&self.state);
        state.transport_up = false;
        state.transport_events.push_back(TransportEvent::Down { reason: reason.to_string() });
    }

    /// Make the next `count` transport establishment attempts fail.
    pub fn fail_next_connects(&self, count: u32) {
        lock(&self.state).fail_next_connects = count;
    }

    /// Take all captured outgoing envelopes.
    #[must_use]
    pub fn take_outgoing(&self) -> Vec<Envelope> {
        std::mem::take(&mut lock(&self.state).outgoing)
    }

    /// Whether the simulated physical channel is currently up.
    #[must_use]
    pub fn is_transport_up(&self) -> bool {
        lock(&self.state).transport_up
    }

    /// Number of renders the runtime performed.
    #[must_use]
    pub fn render_count(&self) -> usize {
        lock(&self.state).renders
    }

    /// End the runtime loop at the next cycle boundary.
    pub fn stop(&self) {
        lock(&self.state).stopped = true;
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;

    async fn poll_action(&mut self, _app: &mut App) -> Result<Vec<AppAction>, Self::Error> {
        Ok(lock(&self.state).pending_actions.pop_front().unwrap_or_default())
    }

    async fn poll_transport(&mut self) -> Option<TransportEvent> {
        lock(&self.state).transport_events.pop_front()
    }

    async fn start_transport(&mut self) -> Result<(), Self::Error> {
        // Establishment outcomes go to the FRONT of the queue: scripted
        // server envelopes can only arrive on a channel that is already up.
        let mut state = lock(&self.state);
        if state.fail_next_connects > 0 {
            state.fail_next_connects -= 1;
            state
                .transport_events
                .push_front(TransportEvent::Down { reason: "connection refused".to_string() });
        } else {
            state.transport_up = true;
            state.transport_events.push_front(TransportEvent::Up);
        }
        Ok(())
    }

    fn close_transport(&mut self, _reason: &str) {
        lock(&self.state).transport_up = false;
    }

    async fn send_envelope(&mut self, envelope: Envelope) -> Result<(), Self::Error> {
        lock(&self.state).outgoing.push(envelope);
        Ok(())
    }

    fn render(&mut self, _app: &App) -> Result<(), Self::Error> {
        lock(&self.state).renders += 1;
        Ok(())
    }

    fn should_stop(&self) -> bool {
        let state = lock(&self.state);
        state.stopped
            || (state.pending_actions.is_empty() && state.transport_events.is_empty())
    }

    fn stop(&mut self) {}
}
