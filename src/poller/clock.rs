//! Time source for staleness decisions.
//!
//! Readings are stamped with a monotonic [`Instant`] for staleness and a UTC
//! wall-clock time for display. Going through a trait lets tests freeze or
//! move time without touching the system clock.

use chrono::{DateTime, Utc};
use tokio::time::Instant;

// ---

pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The tokio clock, which honours `tokio::time::pause` in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
