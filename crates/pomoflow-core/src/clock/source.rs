//! Where the clock task reads "now" from.
//!
//! Countdowns are anchored on wall-clock time so a host that sleeps through
//! part of a phase loses that time, as a kitchen timer would. Tests that run
//! under tokio's paused clock use [`MonotonicClock`] instead, which only moves
//! when tokio time moves.

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;

pub trait TimeSource: Send + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// The host's wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall-clock reading taken once, advanced by tokio's clock afterwards.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    base: DateTime<Utc>,
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            base: Utc::now(),
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.origin.elapsed()).unwrap_or(TimeDelta::MAX);
        self.base
            .checked_add_signed(elapsed)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
