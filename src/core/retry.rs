//! Retry policy for outbound calls.
//!
//! The default policy makes exactly one attempt. Callers opt in to extra
//! attempts with exponential backoff.

use std::time::Duration;

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Extra attempts after the first (0 = fail fast)
    pub max_attempts: u32,

    /// Wait before the first retry
    pub initial_delay: Duration,

    /// Upper bound for any single wait
    pub max_delay: Duration,

    /// Growth factor applied per retry
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::no_retry()
    }
}

impl RetryConfig {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }

    /// Default backoff with `retries` extra attempts.
    pub fn with_retries(retries: u32) -> Self {
        Self { max_attempts: retries, ..Self::no_retry() }
    }

    /// Wait before retry number `retry` (1-based). Zero for the first attempt.
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        let Some(exponent) = retry.checked_sub(1) else {
            return Duration::ZERO;
        };

        let factor = self.backoff_multiplier.powi(i32::try_from(exponent).unwrap_or(i32::MAX));
        let delay_ms = self.initial_delay.as_millis() as f64 * factor;

        if (0.0..self.max_delay.as_millis() as f64).contains(&delay_ms) {
            Duration::from_millis(delay_ms.round() as u64)
        } else {
            self.max_delay
        }
    }
}

/// Outcome of [`retry`].
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// Last result observed
    pub result: Result<T, E>,

    /// Attempts made, including the first
    pub attempts: u32,
}

impl<T, E> RetryResult<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Run `operation`, retrying while `should_retry` accepts the error and the
/// policy has attempts left.
pub fn retry<T, E, F, P>(config: &RetryConfig, mut operation: F, should_retry: P) -> RetryResult<T, E>
where
    F: FnMut() -> Result<T, E>,
    P: Fn(&E) -> bool,
{
    let mut attempts = 0;

    loop {
        attempts += 1;
        let result = operation();

        let retryable = matches!(&result, Err(e) if should_retry(e));
        if !retryable || attempts > config.max_attempts {
            return RetryResult { result, attempts };
        }

        let delay = config.delay_for_attempt(attempts);
        tracing::debug!(attempt = attempts, ?delay, "retrying outbound call");
        std::thread::sleep(delay);
    }
}
