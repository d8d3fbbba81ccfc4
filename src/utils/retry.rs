//! Retry with backoff for fallible network operations
//!
//! The executor is classification-driven: the caller supplies a function
//! that sorts each failure into fatal, transient, or throttled. Fatal
//! failures surface immediately; transient ones are retried after a
//! growing delay (doubling or attempt-proportional, per the configured
//! mode); throttled ones (HTTP 429 style) get an extra cooldown on top
//! of the backoff, honoring the server's signal.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How a failed attempt should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Never retry; surface the error as-is
    Fatal,
    /// Retry after backoff
    Transient,
    /// Retry after backoff plus the configured cooldown
    Throttled,
}

/// Growth curve for the delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffMode {
    /// `base * 2^(attempt-1)`
    #[default]
    Exponential,
    /// `base * attempt`, for services that expect polite pacing rather
    /// than rapid doubling
    Linear,
}

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of invocations (first attempt included)
    pub max_attempts: u32,

    /// Base delay for backoff
    pub base_delay: Duration,

    /// How the delay grows with the attempt number
    pub mode: BackoffMode,

    /// Cap on the backoff delay
    pub max_delay: Duration,

    /// Extra wait applied after a throttled failure; callers set this to
    /// twice their standard inter-request delay
    pub throttle_cooldown: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            mode: BackoffMode::Exponential,
            max_delay: Duration::from_secs(30),
            throttle_cooldown: Duration::from_secs(4),
        }
    }
}

impl RetryConfig {
    /// Create a configuration with a custom attempt budget
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Backoff before the retry that follows attempt `attempt` (1-based),
    /// per the configured mode, capped at `max_delay`.
    fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = match self.mode {
            BackoffMode::Exponential => 2u64.saturating_pow(attempt.saturating_sub(1)),
            BackoffMode::Linear => u64::from(attempt),
        };
        let delay = self.base_delay.saturating_mul(factor.min(u32::MAX as u64) as u32);
        delay.min(self.max_delay)
    }
}

/// Execute `operation` under the retry policy in `config`.
///
/// `classify` decides the fate of each failure. Exactly `max_attempts`
/// invocations happen for a persistently transient failure; exactly one
/// for a fatal failure. The last error is surfaced on exhaustion.
pub async fn with_backoff<T, E, F, Fut, C>(
    config: &RetryConfig,
    operation: F,
    classify: C,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryClass,
    E: std::fmt::Display,
{
    let mut last_error = None;

    for attempt in 1..=config.max_attempts.max(1) {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                let class = classify(&e);
                if class == RetryClass::Fatal {
                    warn!(error = %e, "Non-retryable failure");
                    return Err(e);
                }

                let is_last = attempt == config.max_attempts.max(1);
                warn!(
                    attempt,
                    max_attempts = config.max_attempts,
                    error = %e,
                    "Attempt failed"
                );

                if !is_last {
                    let mut wait = config.backoff_after(attempt);
                    if class == RetryClass::Throttled {
                        // Server-side throttling signal: cool down beyond
                        // the exponential schedule.
                        wait += config.throttle_cooldown;
                    }
                    debug!(wait_ms = wait.as_millis() as u64, "Backing off before retry");
                    tokio::time::sleep(wait).await;
                }

                last_error = Some(e);
            }
        }
    }

    // max_attempts >= 1 guarantees at least one iteration ran
    Err(last_error.expect("retry loop ran at least once"))
}
