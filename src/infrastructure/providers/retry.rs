//! Capped exponential backoff for transient provider failures.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::models::{BackendId, RetryConfig};
use crate::domain::ports::ProviderError;

/// Retry policy configuration for handling transient provider errors
///
/// Delay before retry `n` (0-indexed) is `initial_backoff × 2^n`, capped at
/// `max_backoff`. Non-retryable errors are returned on the first failure.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Initial backoff duration in milliseconds
    initial_backoff_ms: u64,
    /// Maximum backoff duration in milliseconds
    max_backoff_ms: u64,
}

impl RetryPolicy {
    /// Policy with explicit attempts and backoff bounds.
    pub const fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms,
        }
    }

    /// Policy from the `retry` config section.
    pub const fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_backoff_ms,
            config.max_backoff_ms,
        )
    }

    /// Policy that never retries.
    pub const fn none() -> Self {
        Self::new(0, 1, 1)
    }

    /// Retries after the first attempt.
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Execute an operation with exponential backoff retry logic
    pub async fn execute<F, Fut, T>(
        &self,
        backend: &BackendId,
        mut operation: F,
    ) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(backend = %backend, attempt, "call succeeded after retries");
                    }
                    return Ok(result);
                }
                Err(err) => {
                    if !self.should_retry(&err, attempt) {
                        if err.is_retryable() {
                            warn!(backend = %backend, attempts = attempt + 1, error = %err, "giving up after retries");
                        } else {
                            debug!(backend = %backend, error = %err, "permanent error, not retrying");
                        }
                        return Err(err);
                    }

                    let backoff = self.calculate_backoff(attempt);
                    warn!(
                        backend = %backend,
                        attempt = attempt + 1,
                        error = %err,
                        backoff_ms = backoff.as_millis() as u64,
                        "transient provider error, retrying"
                    );

                    sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Backoff schedule without jitter: initial, 2×initial, 4×initial, ... up to max.
    fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.initial_backoff_ms))
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_interval(Duration::from_millis(self.max_backoff_ms))
            .with_max_elapsed_time(None)
            .build()
    }

    /// Delay before retry number `attempt` (0-indexed).
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let mut schedule = self.schedule();
        let mut delay = Duration::from_millis(self.initial_backoff_ms);
        for _ in 0..=attempt {
            if let Some(next) = schedule.next_backoff() {
                delay = next;
            }
        }
        delay
    }

    const fn should_retry(&self, error: &ProviderError, attempt: u32) -> bool {
        attempt < self.max_retries && error.is_retryable()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
