//! Deterministic simulation environment.
//!
//! [`SimEnv`] implements [`Environment`] with a manually advanced virtual
//! clock and a seeded RNG, so reconnect schedules, ack deadlines, and
//! connection ids are identical run to run. Sleeping advances the virtual
//! clock instead of waiting.

use std::{
    ops::{Add, Sub},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use hirewire_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Virtual instant: milliseconds from the simulation origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SimInstant(u64);

impl SimInstant {
    /// Milliseconds since the simulation origin.
    #[must_use]
    pub fn millis(self) -> u64 {
        self.0
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(rhs.0))
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        Self(self.0 + rhs.as_millis() as u64)
    }
}

/// Deterministic environment: virtual clock plus seeded entropy.
#[derive(Clone)]
pub struct SimEnv {
    clock: Arc<Mutex<u64>>,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl SimEnv {
    /// Create an environment whose randomness derives from `seed`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            clock: Arc::new(Mutex::new(0)),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    /// Advance the virtual clock.
    pub fn advance(&self, delta: Duration) {
        *lock(&self.clock) += delta.as_millis() as u64;
    }
}

/// Poison-tolerant lock: simulation state stays usable even if a test
/// thread panicked while holding it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        SimInstant(*lock(&self.clock))
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.advance(duration);
        async {}
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        lock(&self.rng).fill_bytes(buffer);
    }
}
