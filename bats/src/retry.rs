//! Retry policies for transient failures of a single external call.
//!
//! Used for reasoning-endpoint calls (`RetryingLlm`) and tool calls (`ActNode`).
//! Scoped to one call; unrelated to the session's pivot `attempts` counter.

use std::future::Future;
use std::time::Duration;

/// Retry policy for one external call.
///
/// `max_attempts` counts retries after the first try, so `Exponential { max_attempts: 2, .. }`
/// makes at most 3 calls in total.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryPolicy {
    /// No retries; the first failure is returned.
    None,
    /// Fixed interval between retries.
    Fixed {
        max_attempts: usize,
        interval: Duration,
    },
    /// Exponential backoff: `initial_interval * multiplier^attempt`, capped at `max_interval`.
    Exponential {
        max_attempts: usize,
        initial_interval: Duration,
        max_interval: Duration,
        multiplier: f64,
    },
}

impl RetryPolicy {
    pub fn none() -> Self {
        RetryPolicy::None
    }

    pub fn fixed(max_attempts: usize, interval: Duration) -> Self {
        RetryPolicy::Fixed {
            max_attempts,
            interval,
        }
    }

    pub fn exponential(
        max_attempts: usize,
        initial_interval: Duration,
        max_interval: Duration,
        multiplier: f64,
    ) -> Self {
        RetryPolicy::Exponential {
            max_attempts,
            initial_interval,
            max_interval,
            multiplier,
        }
    }

    /// Three tries in total, waiting 1s then 2s (never more than 10s).
    pub fn standard() -> Self {
        Self::exponential(2, Duration::from_secs(1), Duration::from_secs(10), 2.0)
    }

    /// Whether another retry is allowed after `attempt` failed retries (0-based).
    pub fn should_retry(&self, attempt: usize) -> bool {
        attempt < self.max_attempts()
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: usize) -> Duration {
        match self {
            RetryPolicy::None => Duration::ZERO,
            RetryPolicy::Fixed { interval, .. } => *interval,
            RetryPolicy::Exponential {
                initial_interval,
                max_interval,
                multiplier,
                ..
            } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let delay_secs = initial_interval.as_secs_f64() * multiplier.powi(exponent);
                Duration::try_from_secs_f64(delay_secs.max(0.0))
                    .map_or(*max_interval, |d| d.min(*max_interval))
            }
        }
    }

    pub fn max_attempts(&self) -> usize {
        match self {
            RetryPolicy::None => 0,
            RetryPolicy::Fixed { max_attempts, .. } => *max_attempts,
            RetryPolicy::Exponential { max_attempts, .. } => *max_attempts,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::None
    }
}

/// Runs `op` and retries it per `policy` while `is_transient(&err)` holds.
///
/// Logs a warning before each sleep. Returns the last error once retries run out
/// or the error is not transient.
pub async fn retry_async<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    is_transient: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if !is_transient(&e) || !policy.should_retry(attempt) {
                    return Err(e);
                }
                let delay = policy.delay(attempt);
                tracing::warn!(
                    call = label,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient failure, retrying"
                );
                if delay > Duration::ZERO {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
        }
    }
}
