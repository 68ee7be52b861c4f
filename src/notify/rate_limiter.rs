use crate::message::Timestamp;
use crate::notify::clock::{Clock, SystemClock};
use chrono::Duration;
use log::debug;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Sliding-window limiter for outbound webhook calls
///
/// Admits a call only if fewer than `max_calls` calls were admitted within the
/// trailing `window`, measured from the moment of the check. The check and the
/// record happen under one lock, so concurrent callers can never be admitted
/// past the limit.
pub struct RateLimiter {
    /// Length of the trailing window
    window: Duration,
    /// Maximum number of calls admitted per window
    max_calls: usize,
    /// Time source
    clock: Arc<dyn Clock>,
    /// Timestamps of admitted calls still inside the window
    recent_calls: Mutex<VecDeque<Timestamp>>,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("window", &self.window)
            .field("max_calls", &self.max_calls)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    /// Create a limiter driven by the system clock
    ///
    /// # Arguments
    ///
    /// * `window` - Length of the trailing window
    /// * `max_calls` - Calls admitted per window; `0` rejects everything
    ///
    /// A zero or negative `window` also rejects everything.
    pub fn new(window: Duration, max_calls: usize) -> Self {
        Self::with_clock(window, max_calls, Arc::new(SystemClock))
    }

    /// Create a limiter with an injected time source
    pub fn with_clock(window: Duration, max_calls: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            max_calls,
            clock,
            recent_calls: Mutex::new(VecDeque::with_capacity(max_calls.min(1024))),
        }
    }

    /// Check whether a call may be made now, recording it if so
    ///
    /// Expired timestamps are purged first. If fewer than `max_calls` remain,
    /// the current time is recorded and `true` is returned. Otherwise nothing
    /// is recorded and `false` is returned.
    pub fn is_available(&self) -> bool {
        if self.window <= Duration::zero() {
            debug!("Webhook call rejected, window {} is not positive", self.window);
            return false;
        }

        let now = self.clock.now();
        let mut recent = self.lock_window();
        Self::purge(&mut recent, now, self.window);

        if recent.len() < self.max_calls {
            recent.push_back(now);
            debug!(
                "Webhook call admitted ({}/{} in window)",
                recent.len(),
                self.max_calls
            );
            true
        } else {
            debug!(
                "Webhook call rejected, {} calls already in window",
                recent.len()
            );
            false
        }
    }

    /// Number of admitted calls in the current window
    pub fn current_count(&self) -> usize {
        let now = self.clock.now();
        let mut recent = self.lock_window();
        Self::purge(&mut recent, now, self.window);
        recent.len()
    }

    /// Calls still available in the current window
    pub fn remaining(&self) -> usize {
        self.max_calls.saturating_sub(self.current_count())
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    /// A panic while holding the lock cannot leave the window half-updated,
    /// so a poisoned lock is safe to reuse.
    fn lock_window(&self) -> MutexGuard<'_, VecDeque<Timestamp>> {
        self.recent_calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drop timestamps whose age is at least `window`
    ///
    /// A window reaching back past the earliest representable date expires nothing.
    fn purge(recent: &mut VecDeque<Timestamp>, now: Timestamp, window: Duration) {
        let Some(cutoff) = now.checked_sub_signed(window) else {
            return;
        };

        // Clock adjustments can make entries arrive out of order, so scan all
        recent.retain(|&time| time > cutoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::clock::{ManualClock, MockClock};
    use chrono::Utc;
    use std::sync::Barrier;

    fn manual_limiter(window: Duration, max_calls: usize) -> (RateLimiter, ManualClock) {
        let clock = ManualClock::new(Utc::now());
        let limiter = RateLimiter::with_clock(window, max_calls, Arc::new(clock.clone()));
        (limiter, clock)
    }

    #[test]
    fn test_rate_limiter_allows_within_limit() {
        let (limiter, _clock) = manual_limiter(Duration::minutes(1), 3);

        assert!(limiter.is_available());
        assert!(limiter.is_available());
        assert!(limiter.is_available());

        // Fourth should be blocked
        assert!(!limiter.is_available());
        assert_eq!(limiter.current_count(), 3);
    }

    #[test]
    fn test_rejected_call_records_nothing() {
        let (limiter, clock) = manual_limiter(Duration::minutes(1), 1);

        assert!(limiter.is_available());
        clock.advance(Duration::seconds(30));
        for _ in 0..10 {
            assert!(!limiter.is_available());
        }
        assert_eq!(limiter.current_count(), 1);

        // Only the first call occupies the window, so it frees up at t=60s
        clock.advance(Duration::seconds(30));
        assert!(limiter.is_available());
    }

    #[test]
    fn test_window_resets_after_expiry() {
        let (limiter, clock) = manual_limiter(Duration::minutes(1), 5);

        for _ in 0..5 {
            assert!(limiter.is_available());
        }
        assert!(!limiter.is_available());

        clock.advance(Duration::minutes(1));
        for _ in 0..5 {
            assert!(limiter.is_available());
        }
        assert!(!limiter.is_available());
    }

    #[test]
    fn test_exact_boundary_is_expired() {
        let (limiter, clock) = manual_limiter(Duration::seconds(60), 1);

        assert!(limiter.is_available());

        clock.advance(Duration::seconds(60) - Duration::milliseconds(1));
        assert!(!limiter.is_available());

        clock.advance(Duration::milliseconds(1));
        assert!(limiter.is_available());
    }

    #[test]
    fn test_rate_limiter_sliding_window() {
        let (limiter, clock) = manual_limiter(Duration::minutes(1), 2);

        assert!(limiter.is_available());
        clock.advance(Duration::seconds(20));
        assert!(limiter.is_available());
        assert!(!limiter.is_available());

        // First call expires at t=60s, second still counts
        clock.advance(Duration::seconds(41));
        assert_eq!(limiter.current_count(), 1);
        assert!(limiter.is_available());
        assert!(!limiter.is_available());
    }

    #[test]
    fn test_zero_max_calls_rejects_everything() {
        let (limiter, clock) = manual_limiter(Duration::minutes(1), 0);

        assert!(!limiter.is_available());
        clock.advance(Duration::hours(1));
        assert!(!limiter.is_available());
        assert_eq!(limiter.current_count(), 0);
        assert_eq!(limiter.remaining(), 0);
    }

    #[test]
    fn test_non_positive_window_rejects_everything() {
        for window in [Duration::zero(), Duration::seconds(-5)] {
            let (limiter, clock) = manual_limiter(window, 2);

            let admitted = (0..100)
                .filter(|_| {
                    clock.advance(Duration::seconds(1));
                    limiter.is_available()
                })
                .count();

            assert_eq!(admitted, 0, "window {} admitted calls", window);
            assert_eq!(limiter.current_count(), 0);
        }
    }

    #[test]
    fn test_huge_window_does_not_overflow() {
        let (limiter, _clock) = manual_limiter(Duration::seconds(10_000_000_000_000), 2);

        assert!(limiter.is_available());
        assert!(limiter.is_available());
        assert!(!limiter.is_available());
        assert_eq!(limiter.current_count(), 2);
    }

    #[test]
    fn test_remaining() {
        let (limiter, _clock) = manual_limiter(Duration::minutes(1), 3);

        assert_eq!(limiter.remaining(), 3);
        limiter.is_available();
        assert_eq!(limiter.remaining(), 2);
    }

    #[test]
    fn test_clock_read_once_per_check() {
        let now = Utc::now();
        let mut clock = MockClock::new();
        clock.expect_now().times(2).return_const(now);

        let limiter = RateLimiter::with_clock(Duration::minutes(1), 1, Arc::new(clock));
        assert!(limiter.is_available());
        assert!(!limiter.is_available());
    }

    #[test]
    fn test_concurrent_callers_never_over_admitted() {
        let max_calls = 20;
        let extra = 15;
        let (limiter, _clock) = manual_limiter(Duration::minutes(1), max_calls);
        let barrier = Barrier::new(max_calls + extra);

        let admitted = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..max_calls + extra)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        limiter.is_available()
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|&ok| ok)
                .count()
        });

        assert_eq!(admitted, max_calls);
        assert_eq!(limiter.current_count(), max_calls);
    }
}

// Property-based tests
#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::notify::clock::ManualClock;
    use chrono::Utc;
    use quickcheck_macros::quickcheck;

    // Within one window, exactly min(attempts, max_calls) calls are admitted
    #[quickcheck]
    fn prop_admits_at_most_max_calls(max_calls: u8, attempts: u8) -> bool {
        let max_calls = (max_calls % 40) as usize;
        let attempts = attempts as usize;
        let clock = ManualClock::new(Utc::now());
        let limiter =
            RateLimiter::with_clock(Duration::minutes(1), max_calls, Arc::new(clock.clone()));

        let mut admitted = 0;
        for _ in 0..attempts {
            if limiter.is_available() {
                admitted += 1;
            }
            clock.advance(Duration::milliseconds(100));
        }

        admitted == attempts.min(max_calls)
    }

    // Once the window fully elapses, a full quota is available again
    #[quickcheck]
    fn prop_quota_restored_after_window(max_calls: u8, window_secs: u16) -> bool {
        let max_calls = (max_calls % 40) as usize;
        let window = Duration::seconds(window_secs as i64 + 1);
        let clock = ManualClock::new(Utc::now());
        let limiter = RateLimiter::with_clock(window, max_calls, Arc::new(clock.clone()));

        for _ in 0..max_calls {
            limiter.is_available();
        }
        clock.advance(window);

        let restored = (0..max_calls).all(|_| limiter.is_available());
        restored && !limiter.is_available()
    }
}
