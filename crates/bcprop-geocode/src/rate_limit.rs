//! Process-wide spacing of outbound geocoder calls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bcprop_core::{Clock, SystemClock};
use tokio::sync::Mutex;

/// Serializes callers so consecutive calls start at least `min_interval`
/// apart.
///
/// The lock is held across the wait, so concurrent callers queue up and
/// each one observes the slot reserved by the previous caller.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    clock: Arc<dyn Clock>,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self::with_clock(min_interval, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            min_interval,
            clock,
            last: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until a call may start, then reserves the slot.
    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;
        let now = self.clock.now();
        let wait = wait_time(*last, now, self.min_interval);
        if !wait.is_zero() {
            tracing::debug!(wait_ms = wait.as_millis(), "geocoder throttle waiting");
            tokio::time::sleep(wait).await;
        }
        *last = Some(now + wait);
    }

    /// How long a caller arriving now would wait.
    pub async fn next_wait(&self) -> Duration {
        let last = self.last.lock().await;
        wait_time(*last, self.clock.now(), self.min_interval)
    }
}

/// Remaining gap before the next call, given the last reserved slot.
#[must_use]
pub fn wait_time(last: Option<Instant>, now: Instant, min_interval: Duration) -> Duration {
    match last {
        Some(previous) => (previous + min_interval).saturating_duration_since(now),
        None => Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use bcprop_core::ManualClock;

    use super::*;

    #[test]
    fn first_call_never_waits() {
        let now = Instant::now();
        assert_eq!(wait_time(None, now, Duration::from_secs(1)), Duration::ZERO);
    }

    #[test]
    fn call_inside_interval_waits_for_remainder() {
        let start = Instant::now();
        let now = start + Duration::from_millis(300);
        assert_eq!(
            wait_time(Some(start), now, Duration::from_secs(1)),
            Duration::from_millis(700)
        );
    }

    #[test]
    fn call_after_interval_does_not_wait() {
        let start = Instant::now();
        let now = start + Duration::from_millis(1500);
        assert_eq!(
            wait_time(Some(start), now, Duration::from_secs(1)),
            Duration::ZERO
        );
    }

    #[tokio::test]
    async fn acquire_reserves_slot_on_injected_clock() {
        let clock = ManualClock::new();
        let limiter = RateLimiter::with_clock(Duration::from_secs(1), Arc::new(clock.clone()));

        limiter.acquire().await;
        assert_eq!(limiter.next_wait().await, Duration::from_secs(1));

        clock.advance(Duration::from_millis(400));
        assert_eq!(limiter.next_wait().await, Duration::from_millis(600));

        clock.advance(Duration::from_millis(600));
        assert_eq!(limiter.next_wait().await, Duration::ZERO);
    }

    #[tokio::test]
    async fn zero_interval_never_waits() {
        let limiter = RateLimiter::new(Duration::ZERO);
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(limiter.next_wait().await, Duration::ZERO);
    }
}
