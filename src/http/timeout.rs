//! Idle and shutdown-grace timeout bookkeeping.

use std::time::{Duration, Instant};

/// Source of monotonic time for a connection.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// [`Clock`] backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Tracks the last transmission instant and the start of a graceful close.
///
/// Time is always passed in, so the tracker itself never reads a clock.
#[derive(Debug, Clone)]
pub struct TimeoutTracker {
    idle: Duration,
    shutdown_grace: Duration,
    last_transmission: Option<Instant>,
    shutdown_start: Option<Instant>,
}

impl TimeoutTracker {
    pub fn new(idle: Duration, shutdown_grace: Duration) -> Self {
        Self {
            idle,
            shutdown_grace,
            last_transmission: None,
            shutdown_start: None,
        }
    }

    /// Stamp `now` as the last successful read or write.
    pub fn refresh(&mut self, now: Instant) {
        self.last_transmission = Some(now);
    }

    /// Record the start of a graceful close. Later calls keep the first stamp.
    pub fn begin_shutdown(&mut self, now: Instant) {
        if self.shutdown_start.is_none() {
            self.shutdown_start = Some(now);
        }
    }

    /// Whether the applicable threshold has elapsed at `now`.
    ///
    /// While `closing` with a recorded shutdown start the grace period
    /// applies; otherwise the idle period since the last transmission.
    pub fn is_exceeded(&self, now: Instant, closing: bool) -> bool {
        if closing {
            if let Some(start) = self.shutdown_start {
                return now.saturating_duration_since(start) > self.shutdown_grace;
            }
        }

        match self.last_transmission {
            Some(last) => now.saturating_duration_since(last) > self.idle,
            None => false,
        }
    }
}
