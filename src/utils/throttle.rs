//! Global call throttle shared by every caller of an external service
//!
//! One `Throttle` instance guards one external service class (the scrape
//! target, the translation service). `acquire()` returns no sooner than
//! `60 / calls_per_minute` seconds after the previous `acquire()` across
//! ALL sharers, so concurrent tasks cannot multiply the request rate.

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::time::Duration;

/// Minimum-interval limiter over a single external service
pub struct Throttle {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    min_interval: Duration,
}

impl Throttle {
    /// Create a throttle allowing `calls_per_minute` calls, evenly spaced.
    ///
    /// A zero rate is clamped to one call per minute.
    pub fn per_minute(calls_per_minute: u32) -> Self {
        let calls = calls_per_minute.max(1);
        Self::with_interval(Duration::from_secs_f64(60.0 / f64::from(calls)))
    }

    /// Create a throttle with an explicit minimum interval between calls
    pub fn with_interval(min_interval: Duration) -> Self {
        // Burst of one: the very first call passes, every later call
        // waits out the full interval.
        let interval = min_interval.max(Duration::from_millis(1));
        let quota = Quota::with_period(interval)
            .unwrap_or_else(|| Quota::per_minute(std::num::NonZeroU32::new(1).unwrap()));
        Self {
            limiter: RateLimiter::direct(quota),
            min_interval: interval,
        }
    }

    /// Wait until the configured interval has elapsed since the previous
    /// acquisition. Never errors; the wait is bounded by `min_interval`.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// The enforced minimum interval between calls
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_interval_from_rate() {
        let throttle = Throttle::per_minute(30);
        assert_eq!(throttle.min_interval(), Duration::from_secs(2));

        let throttle = Throttle::per_minute(60);
        assert_eq!(throttle.min_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_rate_clamped() {
        let throttle = Throttle::per_minute(0);
        assert_eq!(throttle.min_interval(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_consecutive_acquisitions_are_spaced() {
        let throttle = Throttle::with_interval(Duration::from_millis(50));
        let mut stamps = Vec::new();
        for _ in 0..3 {
            throttle.acquire().await;
            stamps.push(Instant::now());
        }
        for pair in stamps.windows(2) {
            // Allow a small scheduling tolerance below the nominal period.
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(45));
        }
    }

    #[tokio::test]
    async fn test_throttle_is_global_across_tasks() {
        let throttle = Arc::new(Throttle::with_interval(Duration::from_millis(40)));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let throttle = Arc::clone(&throttle);
            handles.push(tokio::spawn(async move {
                throttle.acquire().await;
                Instant::now()
            }));
        }

        let mut stamps = Vec::new();
        for handle in handles {
            stamps.push(handle.await.unwrap());
        }
        stamps.sort();

        // First call is immediate; the remaining three wait their turn.
        assert!(stamps.last().unwrap().duration_since(start) >= Duration::from_millis(100));
    }
}
