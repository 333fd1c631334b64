//! Connection lifecycle state machine.
//!
//! Manages the realtime channel's lifecycle: credentialed handshake, bounded
//! reconnection with fixed or capped-exponential delay, heartbeats, timeouts,
//! and teardown. Uses the action pattern: methods take time as input and
//! return actions for the driver to execute. This keeps the state machine
//! pure (no I/O) and makes testing straightforward.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐  open   ┌────────────┐  auth:ok   ┌───────────┐
//! │ Disconnected │────────>│ Connecting │───────────>│ Connected │
//! └──────────────┘         └────────────┘            └───────────┘
//!        ▲                   │        ▲                    │
//!        │ attempts          │ lost   │ tick               │ lost
//!        │ exhausted,        ▼        │ (retry due)        ▼
//!        │ auth:error   ┌───────────────┐  <───────────────┘
//!        └──────────────│ ReconnectWait │
//!                       └───────────────┘
//!
//! close() from any state leads to Closed.
//! ```
//!
//! Reconnection replays the same handshake credential and never assumes
//! server-side session continuity: every accepted handshake is followed by a
//! [`ConnectionAction::RequestResync`], and the caller treats the snapshot as
//! authoritative.

use std::{
    ops::{Add, Sub},
    time::{Duration, Instant},
};

use hirewire_proto::{
    Envelope, ServerEvent,
    payloads::{ClientCommand, session::AuthRequest},
};

use crate::error::ConnectionError;

/// Bounded number of reconnection attempts before giving up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Delay before each reconnection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1000);

/// Time allowed to complete the auth handshake after the transport is up.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval at which the connection sends ping envelopes while connected.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);

/// Maximum time allowed without any inbound activity before the connection
/// is treated as lost.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No channel. Initial state, and terminal after exhausted retries or a
    /// rejected credential.
    Disconnected,
    /// Transport establishment or handshake in progress.
    Connecting,
    /// Handshake accepted; domain events flow.
    Connected,
    /// Channel lost; a retry is scheduled.
    ReconnectWait,
    /// Torn down by the owner. No further transitions.
    Closed,
}

/// Lifecycle signals observable by subscribers.
///
/// Fan-out, not consume-once: every subscriber sees every signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lifecycle {
    /// Handshake accepted; the channel is live.
    Connect,
    /// The channel was lost, or retries were exhausted.
    Disconnect {
        /// Why the channel went away.
        reason: String,
    },
    /// A connection attempt failed (transport error or rejected credential).
    ConnectError {
        /// What went wrong.
        reason: String,
    },
}

/// Actions returned by the connection state machine.
///
/// The driver executes these:
/// - `StartTransport`: open the physical channel
/// - `Send`: write the envelope to the channel
/// - `CloseTransport`: tear the channel down
/// - `RequestResync`: the owner should issue a resync request
/// - `Notify`: fan the lifecycle signal out to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open the physical channel. The driver reports back via
    /// [`Connection::transport_up`] or [`Connection::transport_lost`].
    StartTransport,

    /// Send this envelope to the server.
    Send(Envelope),

    /// Close the physical channel with this reason.
    CloseTransport {
        /// Reason for closing.
        reason: String,
    },

    /// Handshake accepted: the owner must request a full state snapshot.
    /// The server may have discarded all prior session state, so the client
    /// never merges with what it held before the (re)connect.
    RequestResync,

    /// Fan this lifecycle signal out to subscribers.
    Notify(Lifecycle),
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Reconnection attempts before giving up (terminal Disconnected).
    pub max_reconnect_attempts: u32,
    /// Base delay before a reconnection attempt.
    pub reconnect_delay: Duration,
    /// Cap for exponential growth of the reconnect delay. `None` keeps the
    /// delay fixed at `reconnect_delay`.
    pub reconnect_delay_cap: Option<Duration>,
    /// Timeout for completing the handshake.
    pub handshake_timeout: Duration,
    /// Heartbeat interval (should be < `idle_timeout` / 2).
    pub heartbeat_interval: Duration,
    /// Idle timeout before the channel is treated as lost.
    pub idle_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            reconnect_delay_cap: None,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

/// Connection lifecycle state machine.
///
/// This is a pure state machine - no I/O, no clock access. Time is passed as
/// a parameter to the methods that need it, and the `Instant` type is generic
/// to support virtual time in deterministic tests.
#[derive(Debug, Clone)]
pub struct Connection<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration> + Add<Duration, Output = I>,
{
    /// Current state.
    state: ConnectionState,
    /// Configuration.
    config: ConnectionConfig,
    /// Handshake credential, replayed verbatim on every reconnect.
    credential: AuthRequest,
    /// Connection attempts made in the current retry cycle.
    attempts_made: u32,
    /// When the pending retry fires. Only set in `ReconnectWait`.
    retry_at: Option<I>,
    /// When the in-flight attempt started. Only set in `Connecting`.
    connect_started: Option<I>,
    /// Last inbound activity timestamp.
    last_activity: I,
    /// Last heartbeat sent timestamp.
    last_heartbeat: Option<I>,
    /// Session ID assigned by the server on the last accepted handshake.
    session_id: Option<String>,
}

impl<I> Connection<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration> + Add<Duration, Output = I>,
{
    /// Create a new connection in [`ConnectionState::Disconnected`].
    ///
    /// # Errors
    ///
    /// - `ConnectionError::MissingCredential` if the token is empty. No
    ///   connection attempt is ever made without a credential.
    pub fn new(
        credential: AuthRequest,
        config: ConnectionConfig,
        now: I,
    ) -> Result<Self, ConnectionError> {
        if credential.token.is_empty() {
            return Err(ConnectionError::MissingCredential);
        }

        Ok(Self {
            state: ConnectionState::Disconnected,
            config,
            credential,
            attempts_made: 0,
            retry_at: None,
            connect_started: None,
            last_activity: now,
            last_heartbeat: None,
            session_id: None,
        })
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the handshake has been accepted and domain events flow.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Session ID from the last accepted handshake. `None` before the first
    /// handshake completes.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// User the stored credential belongs to.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.credential.user_id
    }

    /// Begin establishing the channel.
    ///
    /// Transitions to `Connecting` and instructs the driver to open the
    /// transport. The auth envelope is sent once the driver reports
    /// [`transport_up`](Self::transport_up).
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if not in `Disconnected` state
    pub fn open(&mut self, now: I) -> Result<Vec<ConnectionAction>, ConnectionError> {
        if self.state != ConnectionState::Disconnected {
            return Err(ConnectionError::InvalidState {
                state: self.state,
                operation: "open".to_string(),
            });
        }

        self.state = ConnectionState::Connecting;
        self.attempts_made = 1;
        self.connect_started = Some(now);
        self.last_activity = now;

        Ok(vec![ConnectionAction::StartTransport])
    }

    /// The driver established the physical channel: send the handshake.
    ///
    /// Ignored outside `Connecting` (a late transport can race a close).
    ///
    /// # Errors
    ///
    /// - `ConnectionError::Protocol` if the auth envelope cannot be encoded
    pub fn transport_up(&mut self, now: I) -> Result<Vec<ConnectionAction>, ConnectionError> {
        if self.state != ConnectionState::Connecting {
            return Ok(vec![]);
        }

        self.last_activity = now;
        let auth = ClientCommand::Auth(self.credential.clone()).into_envelope()?;

        Ok(vec![ConnectionAction::Send(auth)])
    }

    /// Process a session-level inbound event.
    ///
    /// Domain events are routed by the owning client; this machine only
    /// reacts to handshake replies and keepalives, and records activity for
    /// the idle timer on everything else.
    pub fn handle_event(&mut self, event: &ServerEvent, now: I) -> Vec<ConnectionAction> {
        self.last_activity = now;

        match event {
            ServerEvent::AuthOk(ok) if self.state == ConnectionState::Connecting => {
                self.state = ConnectionState::Connected;
                self.session_id = Some(ok.session_id.clone());
                self.attempts_made = 0;
                self.connect_started = None;
                self.last_heartbeat = None;

                vec![
                    ConnectionAction::Notify(Lifecycle::Connect),
                    ConnectionAction::RequestResync,
                ]
            },
            ServerEvent::AuthRejected(rejected) if self.state == ConnectionState::Connecting => {
                // Fatal: retrying with the same credential cannot succeed.
                self.state = ConnectionState::Disconnected;
                self.retry_at = None;
                self.connect_started = None;

                vec![
                    ConnectionAction::CloseTransport { reason: "handshake rejected".to_string() },
                    ConnectionAction::Notify(Lifecycle::ConnectError {
                        reason: rejected.reason.clone(),
                    }),
                ]
            },
            _ => vec![],
        }
    }

    /// The physical channel failed or dropped unexpectedly.
    ///
    /// Never an error to the caller: the machine fails silently into
    /// `ReconnectWait` (or terminal `Disconnected` once the retry budget is
    /// spent).
    pub fn transport_lost(&mut self, reason: &str, now: I) -> Vec<ConnectionAction> {
        match self.state {
            ConnectionState::Connected => {
                let mut actions = vec![ConnectionAction::Notify(Lifecycle::Disconnect {
                    reason: reason.to_string(),
                })];

                // Fresh retry cycle for a drop from Connected.
                self.attempts_made = 0;
                self.schedule_retry(now);
                actions.extend(self.exhaustion_actions());
                actions
            },
            ConnectionState::Connecting => {
                let mut actions = vec![ConnectionAction::Notify(Lifecycle::ConnectError {
                    reason: reason.to_string(),
                })];

                self.connect_started = None;
                self.schedule_retry(now);
                actions.extend(self.exhaustion_actions());
                actions
            },
            ConnectionState::Disconnected
            | ConnectionState::ReconnectWait
            | ConnectionState::Closed => vec![],
        }
    }

    /// Process periodic maintenance: retry deadlines, handshake and idle
    /// timeouts, heartbeats.
    pub fn tick(&mut self, now: I) -> Vec<ConnectionAction> {
        match self.state {
            ConnectionState::ReconnectWait => {
                let due = self.retry_at.is_some_and(|at| now >= at);
                if !due {
                    return vec![];
                }

                self.retry_at = None;
                self.attempts_made += 1;
                self.state = ConnectionState::Connecting;
                self.connect_started = Some(now);

                vec![ConnectionAction::StartTransport]
            },
            ConnectionState::Connecting => {
                let timed_out = self
                    .connect_started
                    .is_some_and(|started| now - started > self.config.handshake_timeout);
                if !timed_out {
                    return vec![];
                }

                self.transport_lost("handshake timeout", now)
            },
            ConnectionState::Connected => {
                let idle = now - self.last_activity;
                if idle > self.config.idle_timeout {
                    let mut actions = vec![ConnectionAction::CloseTransport {
                        reason: format!("idle timeout after {idle:?}"),
                    }];
                    actions.extend(self.transport_lost("idle timeout", now));
                    return actions;
                }

                let should_ping = match self.last_heartbeat {
                    None => true,
                    Some(last) => now - last >= self.config.heartbeat_interval,
                };

                if should_ping
                    && let Ok(ping) = ClientCommand::Ping.into_envelope()
                {
                    self.last_heartbeat = Some(now);
                    return vec![ConnectionAction::Send(ping)];
                }

                vec![]
            },
            ConnectionState::Disconnected | ConnectionState::Closed => vec![],
        }
    }

    /// Tear the connection down.
    ///
    /// Cancels any pending retry; the owner is responsible for failing
    /// in-flight sends. A closed machine never transitions again; re-opening
    /// means constructing a fresh connection.
    pub fn close(&mut self) -> Vec<ConnectionAction> {
        let had_channel = matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected
        );

        self.state = ConnectionState::Closed;
        self.retry_at = None;
        self.connect_started = None;

        if had_channel {
            vec![ConnectionAction::CloseTransport { reason: "session closed".to_string() }]
        } else {
            vec![]
        }
    }

    /// Delay before attempt `attempt` (1-based): fixed, or capped
    /// exponential when a cap is configured.
    fn delay_for(&self, attempt: u32) -> Duration {
        match self.config.reconnect_delay_cap {
            None => self.config.reconnect_delay,
            Some(cap) => {
                let doublings = attempt.saturating_sub(1).min(16);
                let grown = self.config.reconnect_delay.saturating_mul(1 << doublings);
                grown.min(cap)
            },
        }
    }

    /// Enter `ReconnectWait` with the next retry scheduled, or terminal
    /// `Disconnected` when the budget is spent.
    fn schedule_retry(&mut self, now: I) {
        if self.attempts_made >= self.config.max_reconnect_attempts {
            self.state = ConnectionState::Disconnected;
            self.retry_at = None;
            return;
        }

        self.state = ConnectionState::ReconnectWait;
        self.retry_at = Some(now + self.delay_for(self.attempts_made + 1));
    }

    /// Terminal-disconnect notification, emitted once the budget is spent.
    fn exhaustion_actions(&self) -> Vec<ConnectionAction> {
        if self.state == ConnectionState::Disconnected {
            vec![ConnectionAction::Notify(Lifecycle::Disconnect {
                reason: "reconnect attempts exhausted".to_string(),
            })]
        } else {
            vec![]
        }
    }
}
