//! Session-scoped connection ownership.
//!
//! [`ConnectionManager`] owns at most one live [`Client`] per instance. It is
//! dependency-injected state scoped to the session lifetime - never a
//! module-level global - so tests cannot leak connections into one another
//! and ownership is explicit.
//!
//! # Contract
//!
//! - `open` is idempotent: a second call returns the existing connection's
//!   id without creating another channel.
//! - `close` releases the connection; the next `open` builds a fresh one.
//! - `current` never creates a connection.
//! - Lifecycle signals (`connect`, `disconnect`, `connect_error`) fan out to
//!   every subscriber through a [`SignalHub`].

use hirewire_core::{ConnectionError, Environment, Lifecycle, SignalHub, Subscription};
use hirewire_proto::{UserId, payloads::session::AuthRequest};

use crate::{
    client::{Client, ClientConfig},
    event::{ClientAction, ClientEvent},
};

/// Opaque identity of a live connection.
///
/// Two `open` calls against the same live connection return equal ids; a
/// close followed by an open yields a different id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{:016x}", self.0)
    }
}

/// Owner of the session's single realtime connection.
pub struct ConnectionManager<E: Environment> {
    env: E,
    config: ClientConfig,
    active: Option<(ConnectionId, Client<E>)>,
    signals: SignalHub<Lifecycle>,
}

impl<E: Environment> ConnectionManager<E> {
    /// Create a manager with no connection.
    pub fn new(env: E, config: ClientConfig) -> Self {
        Self { env, config, active: None, signals: SignalHub::new() }
    }

    /// Open the session connection, or return the existing one.
    ///
    /// Idempotent: while a connection exists (in any lifecycle state), the
    /// same id is returned and no actions are produced. Network-level
    /// failures never surface here; they arrive later as lifecycle signals.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::MissingCredential` if the token is empty. This is
    ///   the one fatal, non-network precondition: no connection attempt is
    ///   made, and a `connect_error` signal is emitted for subscribers.
    pub fn open(
        &mut self,
        user_id: impl Into<UserId>,
        token: impl Into<String>,
    ) -> Result<(ConnectionId, Vec<ClientAction>), ConnectionError> {
        if let Some((id, _)) = &self.active {
            return Ok((*id, vec![]));
        }

        let credential = AuthRequest::new(user_id, token);
        let mut client = match Client::new(self.env.clone(), credential, self.config.clone()) {
            Ok(client) => client,
            Err(err) => {
                self.signals.emit(&Lifecycle::ConnectError { reason: err.to_string() });
                return Err(err);
            },
        };

        let actions = client.open()?;
        let id = ConnectionId(self.env.random_u64());
        self.active = Some((id, client));

        Ok((id, self.fan_out(actions)))
    }

    /// Tear down and release the active connection. A subsequent `open`
    /// creates a fresh connection. No-op when none exists.
    pub fn close(&mut self) -> Vec<ClientAction> {
        match self.active.take() {
            Some((_, mut client)) => {
                let actions = client.close();
                self.fan_out(actions)
            },
            None => vec![],
        }
    }

    /// Id of the existing connection, if any. Never creates one.
    #[must_use]
    pub fn current(&self) -> Option<ConnectionId> {
        self.active.as_ref().map(|(id, _)| *id)
    }

    /// Whether the active connection's handshake has been accepted.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.active.as_ref().is_some_and(|(_, client)| client.is_connected())
    }

    /// User id of the active connection's credential, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.active.as_ref().map(|(_, client)| client.user_id())
    }

    /// Subscribe to lifecycle signals. The callback observes every signal
    /// emitted after registration, in subscription order relative to other
    /// subscribers.
    pub fn subscribe(&self, callback: impl FnMut(&Lifecycle) + 'static) -> Subscription {
        self.signals.subscribe(callback)
    }

    /// Feed an event to the active connection. Events arriving while no
    /// connection exists are dropped (a late transport callback can race a
    /// close).
    pub fn handle(&mut self, event: ClientEvent) -> Vec<ClientAction> {
        let actions = match &mut self.active {
            Some((_, client)) => client.handle(event),
            None => {
                tracing::debug!("dropping event: no active connection");
                return vec![];
            },
        };
        self.fan_out(actions)
    }

    /// Emit `Notify` actions to signal subscribers. The actions are also
    /// passed through unchanged so the caller's own state can track them.
    fn fan_out(&self, actions: Vec<ClientAction>) -> Vec<ClientAction> {
        for action in &actions {
            if let ClientAction::Notify(signal) = action {
                self.signals.emit(signal);
            }
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        rc::Rc,
        sync::{
            Arc,
            atomic::{AtomicU64, Ordering},
        },
        time::{Duration, Instant},
    };

    use hirewire_proto::{ServerEvent, payloads::session::AuthOk};

    use super::*;

    /// Deterministic entropy with a counter, so successive connection ids
    /// are distinct.
    #[derive(Clone, Default)]
    struct TestEnv(Arc<AtomicU64>);

    impl Environment for TestEnv {
        type Instant = Instant;

        fn now(&self) -> Instant {
            Instant::now()
        }

        fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            async {}
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            let round = self.0.fetch_add(1, Ordering::Relaxed);
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = (round as u8).wrapping_add(i as u8);
            }
        }
    }

    #[test]
    fn open_is_idempotent() {
        let mut manager = ConnectionManager::new(TestEnv::default(), ClientConfig::default());

        let (first, actions) = manager.open("u1", "tok1").unwrap();
        assert!(actions.contains(&ClientAction::StartTransport));

        let (second, actions) = manager.open("u1", "tok1").unwrap();
        assert_eq!(first, second);
        assert!(actions.is_empty());
    }

    #[test]
    fn current_never_creates_a_connection() {
        let mut manager = ConnectionManager::new(TestEnv::default(), ClientConfig::default());
        assert_eq!(manager.current(), None);

        let (id, _) = manager.open("u1", "tok1").unwrap();
        assert_eq!(manager.current(), Some(id));
    }

    #[test]
    fn close_then_open_creates_a_fresh_connection() {
        let mut manager = ConnectionManager::new(TestEnv::default(), ClientConfig::default());
        let (first, _) = manager.open("u1", "tok1").unwrap();

        manager.close();
        assert_eq!(manager.current(), None);

        let (second, actions) = manager.open("u1", "tok1").unwrap();
        assert!(actions.contains(&ClientAction::StartTransport));
        assert_eq!(manager.current(), Some(second));
        let _ = first;
    }

    #[test]
    fn missing_credential_is_fatal_and_signalled() {
        let mut manager = ConnectionManager::new(TestEnv::default(), ClientConfig::default());

        let errors = Rc::new(RefCell::new(0u32));
        let seen = errors.clone();
        let _sub = manager.subscribe(move |signal| {
            if matches!(signal, Lifecycle::ConnectError { .. }) {
                *seen.borrow_mut() += 1;
            }
        });

        let result = manager.open("u1", "");
        assert!(matches!(result, Err(ConnectionError::MissingCredential)));
        assert_eq!(manager.current(), None);
        assert_eq!(*errors.borrow(), 1);
    }

    #[test]
    fn connect_signal_fans_out_to_all_subscribers() {
        let mut manager = ConnectionManager::new(TestEnv::default(), ClientConfig::default());

        let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        let first = log.clone();
        let _a = manager.subscribe(move |signal| {
            if matches!(signal, Lifecycle::Connect) {
                first.borrow_mut().push("badge");
            }
        });
        let second = log.clone();
        let _b = manager.subscribe(move |signal| {
            if matches!(signal, Lifecycle::Connect) {
                second.borrow_mut().push("thread-view");
            }
        });

        manager.open("u1", "tok1").unwrap();
        manager.handle(ClientEvent::TransportUp);

        let auth_ok = ServerEvent::AuthOk(AuthOk { session_id: "s1".to_string() })
            .into_envelope()
            .unwrap();
        manager.handle(ClientEvent::EnvelopeReceived(auth_ok));

        assert!(manager.is_connected());
        assert_eq!(*log.borrow(), vec!["badge", "thread-view"]);
    }

    #[test]
    fn events_without_a_connection_are_dropped() {
        let mut manager = ConnectionManager::new(TestEnv::default(), ClientConfig::default());
        let actions = manager.handle(ClientEvent::Tick);
        assert!(actions.is_empty());
    }
}
