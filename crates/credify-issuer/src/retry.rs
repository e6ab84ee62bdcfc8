//! Exponential-backoff retry
//!
//! Retry eligibility is decided by the error's class, never by its text.
//! Non-retryable errors return after a single attempt with no delay.

use credify_core::{CredifyError, ErrorClass};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryOptions {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Error classes that may be retried
    pub retryable: Vec<ErrorClass>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            backoff_multiplier: 2.0,
            retryable: vec![ErrorClass::Transport],
        }
    }
}

impl RetryOptions {
    /// Sleep before retry number `attempt + 1`:
    /// `min(initial_delay * multiplier^attempt, max_delay)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt as i32);
        let millis = self.initial_delay.as_millis() as f64 * factor;
        let capped = millis.min(self.max_delay.as_millis() as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    pub fn is_retryable(&self, err: &CredifyError) -> bool {
        self.retryable.contains(&err.class())
    }
}

/// Result of a retried operation together with the attempts it took
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, CredifyError>,
    pub attempts: u32,
}

impl<T> RetryOutcome<T> {
    /// Attempts beyond the first
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }

    pub fn into_result(self) -> Result<T, CredifyError> {
        self.result
    }
}

#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    options: RetryOptions,
}

impl RetryPolicy {
    pub fn new(options: RetryOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, runs
    /// out of retries or `cancel` fires. The token is checked before every
    /// backoff sleep.
    pub async fn execute<T, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CredifyError>>,
    {
        let max_retries = self.options.max_retries;
        let mut attempt = 0u32;

        loop {
            let err = match op().await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt + 1,
                    }
                }
                Err(err) => err,
            };

            if !self.options.is_retryable(&err) || attempt >= max_retries {
                return RetryOutcome {
                    result: Err(err),
                    attempts: attempt + 1,
                };
            }

            if cancel.is_cancelled() {
                return RetryOutcome {
                    result: Err(CredifyError::Cancelled(format!("{} cancelled", operation))),
                    attempts: attempt + 1,
                };
            }

            let delay = self.options.delay_for(attempt);
            warn!(
                operation,
                attempt = attempt + 1,
                max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying after transient failure"
            );

            tokio::select! {
                _ = cancel.cancelled() => {
                    return RetryOutcome {
                        result: Err(CredifyError::Cancelled(format!("{} cancelled", operation))),
                        attempts: attempt + 1,
                    };
                }
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}
