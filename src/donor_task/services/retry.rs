//! Bounded exponential backoff for transient gateway failures.

use crate::donor_task::ports::DonorGatewayResult;
use std::future::Future;
use std::time::Duration;

/// Retry policy applied to gateway calls.
///
/// Only transient failures are retried. The delay before retry `n`
/// (zero-based) is `initial_backoff * multiplier^n`, capped at
/// `max_backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff: Duration,
    multiplier: u32,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
            multiplier: 2,
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self::default().with_max_retries(0)
    }

    /// Sets the number of retries after the first attempt.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub const fn with_initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    /// Sets the growth factor between consecutive delays.
    #[must_use]
    pub const fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the upper bound for any single delay.
    #[must_use]
    pub const fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Returns the number of retries after the first attempt.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the delay before retry `retry_index` (zero-based).
    #[must_use]
    pub fn backoff_for(&self, retry_index: u32) -> Duration {
        self.multiplier
            .checked_pow(retry_index)
            .and_then(|factor| self.initial_backoff.checked_mul(factor))
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }

    /// Runs `attempt` until it succeeds, fails permanently, or the retry
    /// budget is spent.
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `attempt`.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt: F) -> DonorGatewayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DonorGatewayResult<T>>,
    {
        let mut retries = 0;
        loop {
            match attempt().await {
                Err(err) if err.is_transient() && retries < self.max_retries => {
                    let delay = self.backoff_for(retries);
                    retries += 1;
                    tracing::warn!(
                        operation,
                        retry = retries,
                        max_retries = self.max_retries,
                        ?delay,
                        error = %err,
                        "transient donor failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                outcome => return outcome,
            }
        }
    }
}
