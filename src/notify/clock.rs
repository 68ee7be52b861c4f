//! Time sources for the rate limiter
//!
//! [`SystemClock`] is used in production. [`ManualClock`] lets tests move time
//! explicitly so window expiry can be checked deterministically.

use crate::message::Timestamp;
use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex};

/// Source of the current time
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by `Utc::now()`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Clock that only moves when told to
///
/// Clones share the same underlying time, so a test can keep one handle while
/// the limiter owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current_time: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            current_time: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance the clock by a duration
    pub fn advance(&self, duration: Duration) {
        let mut time = self
            .current_time
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *time += duration;
    }

    /// Set the clock to a specific instant
    pub fn set(&self, instant: Timestamp) {
        let mut time = self
            .current_time
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *time = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self
            .current_time
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
