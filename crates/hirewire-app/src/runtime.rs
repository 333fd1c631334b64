//! Generic runtime for application orchestration.
//!
//! The Runtime drives the event loop, coordinating between:
//! - [`App`]: application state machine
//! - [`Bridge`]: connection bridge to the client
//! - [`Driver`]: platform-specific I/O
//!
//! One logical thread of control: UI actions and transport events are
//! serialized onto the same processing path, so store mutations never
//! interleave and no locking is needed anywhere above the driver.

use hirewire_client::{ClientConfig, Environment};

use crate::{
    App, AppAction, AppEvent, Bridge,
    bridge::TransportOp,
    driver::{Driver, TransportEvent},
};

/// Generic runtime that orchestrates App, Bridge, and Driver.
pub struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    app: App,
    bridge: Bridge<E>,
}

impl<D, E> Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    /// Create a runtime for a session user.
    pub fn new(driver: D, env: E, self_user: impl Into<String>, config: ClientConfig) -> Self {
        let app = App::new(self_user);
        let bridge = Bridge::new(env, config);
        Self { driver, app, bridge }
    }

    /// The application state machine.
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Mutable access to the application state machine.
    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }

    /// The connection bridge.
    pub fn bridge(&self) -> &Bridge<E> {
        &self.bridge
    }

    /// Run the main event loop until the driver asks to stop.
    ///
    /// Returns the final application state for inspection.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(mut self) -> Result<App, D::Error> {
        self.driver.render(&self.app)?;

        loop {
            self.process_cycle().await?;
            if self.driver.should_stop() {
                break;
            }
        }

        self.driver.stop();
        Ok(self.app)
    }

    /// Process one cycle of the event loop: UI input, one transport event,
    /// and a tick.
    pub async fn process_cycle(&mut self) -> Result<(), D::Error> {
        let actions = self.driver.poll_action(&mut self.app).await?;
        self.process_actions(actions).await?;

        if let Some(event) = self.driver.poll_transport().await {
            let events = match event {
                TransportEvent::Up => self.bridge.handle_transport_up(),
                TransportEvent::Down { reason } => self.bridge.handle_transport_lost(&reason),
                TransportEvent::Envelope(envelope) => self.bridge.handle_envelope(envelope),
            };
            self.flush().await?;
            self.process_events(events).await?;
        }

        let events = self.bridge.handle_tick();
        self.flush().await?;
        self.process_events(events).await?;

        Ok(())
    }

    /// Process actions returned by the App, feeding bridge responses back
    /// until the action queue drains.
    async fn process_actions(&mut self, initial: Vec<AppAction>) -> Result<(), D::Error> {
        let mut pending = initial;

        while !pending.is_empty() {
            let actions = std::mem::take(&mut pending);

            for action in actions {
                match action {
                    AppAction::Render => self.driver.render(&self.app)?,
                    other => {
                        let events = self.bridge.process_app_action(other);
                        self.flush().await?;
                        for event in events {
                            pending.extend(self.app.handle(event));
                        }
                    },
                }
            }
        }

        Ok(())
    }

    /// Feed bridge events into the App and execute the resulting actions.
    async fn process_events(&mut self, events: Vec<AppEvent>) -> Result<(), D::Error> {
        for event in events {
            let actions = self.app.handle(event);
            self.process_actions(actions).await?;
        }
        Ok(())
    }

    /// Execute pending transport operations and write outgoing envelopes.
    async fn flush(&mut self) -> Result<(), D::Error> {
        for op in self.bridge.take_transport_ops() {
            match op {
                TransportOp::Start => self.driver.start_transport().await?,
                TransportOp::Close { reason } => self.driver.close_transport(&reason),
            }
        }

        for envelope in self.bridge.take_outgoing() {
            self.driver.send_envelope(envelope).await?;
        }

        Ok(())
    }
}
