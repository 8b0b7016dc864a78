//! Time adapters.
//!
//! - [`MonotonicClock`] wraps `std::time::Instant` for the running daemon.
//! - [`ManualClock`] is advanced by hand so host tests can walk the
//!   scheduler through exact millisecond timelines.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::app::ports::TimePort;

/// System monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl TimePort for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Shared, manually advanced clock.  Clones observe the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    start: Instant,
    now: Arc<Mutex<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        let start = Instant::now();
        Self {
            start,
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    /// Time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        *self.now.lock() - self.start
    }
}

impl TimePort for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}
