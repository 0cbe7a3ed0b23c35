// Retry logic with Retry-After hint support
// Author: kelexine (https://github.com/kelexine)

use backoff::{backoff::Backoff, ExponentialBackoff};
use std::time::Duration;
use tracing::{debug, warn};

/// Failed upstream attempt, as seen by the retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamFailure {
    /// HTTP status, or 0 when the request never got a response.
    pub status: u16,
    pub message: String,
    /// Server-provided wait before the next attempt.
    pub retry_after: Option<Duration>,
}

impl UpstreamFailure {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after: None,
        }
    }
}

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_interval,
            initial_interval: self.initial_interval,
            randomization_factor: 0.3, // Add jitter
            multiplier: 2.0,
            max_interval: self.max_interval,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Parse a `Retry-After` header given in whole or fractional seconds.
/// Capped at 60 seconds.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let seconds: f64 = value.trim().parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some(Duration::from_millis((seconds.min(60.0) * 1000.0) as u64))
}

/// Determine if an HTTP status code is retryable. Status 0 is a transport failure.
pub fn is_retryable(status: u16) -> bool {
    matches!(status, 0 | 429 | 500 | 502 | 503 | 504)
}

/// Execute operation with retry logic
/// - Uses the server's Retry-After hint if available
/// - Falls back to exponential backoff
/// - Stops after `policy.max_attempts`
pub async fn with_retry<F, Fut, T>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, UpstreamFailure>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, UpstreamFailure>>,
{
    let mut backoff = policy.backoff();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(failure) => {
                if !is_retryable(failure.status) || attempt >= policy.max_attempts {
                    return Err(failure);
                }

                let delay = failure
                    .retry_after
                    .or_else(|| backoff.next_backoff())
                    .unwrap_or(policy.max_interval);
                warn!(
                    "{} failed with {} (attempt {}/{}), retrying after {}ms",
                    operation_name,
                    failure.status,
                    attempt,
                    policy.max_attempts,
                    delay.as_millis()
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}
