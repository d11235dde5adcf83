//! Time abstraction for testable timeout handling
//!
//! The engine measures everything in whole monotonic seconds against a
//! single origin. Production uses an `Instant`-anchored clock; tests use a
//! manually advanced clock so timeout and expiry paths run without real
//! delays. The trait is deliberately synchronous: the engine itself never
//! sleeps, only the daemon shell does.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::domain::Timestamp;

/// Source of monotonic engine time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Seconds elapsed since the clock's origin.
    #[must_use]
    fn now(&self) -> Timestamp;
}

/// Shared handle to a clock implementation.
pub type SharedClock = Arc<dyn Clock>;

/// Production clock anchored to process start.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose origin is the moment of construction.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        self.origin.elapsed().as_secs()
    }
}

/// Manually driven clock for tests.
///
/// Clones share the same underlying time, so a test can hand one clone to
/// the engine and keep another to advance.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    seconds: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock starting at second zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock starting at the given second.
    #[must_use]
    pub fn starting_at(seconds: Timestamp) -> Self {
        let clock = Self::new();
        clock.set(seconds);
        clock
    }

    /// Moves time forward by `seconds`.
    pub fn advance(&self, seconds: Timestamp) {
        self.seconds.fetch_add(seconds, Ordering::SeqCst);
    }

    /// Jumps to an absolute second. Never moves backwards.
    pub fn set(&self, seconds: Timestamp) {
        self.seconds.fetch_max(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.seconds.load(Ordering::SeqCst)
    }
}

/// Shared production clock.
#[must_use]
pub fn monotonic_clock() -> SharedClock {
    Arc::new(MonotonicClock::new())
}
