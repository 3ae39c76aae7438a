//! Exponential backoff for fallible async operations
//!
//! [`RetryManager::execute_with_retry`] runs an operation up to
//! `max_retries + 1` times. Errors that report
//! [`is_retryable`](crate::errors::PipelineError::is_retryable) `== false` are
//! returned immediately. After a failed attempt `n` (0-indexed) the manager
//! sleeps `initial_delay * backoff_multiplier^n` before trying again.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::errors::{PipelineError, PipelineResult};

/// Retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub backoff_multiplier: f64,
    pub initial_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_multiplier: 2.0,
            initial_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RetryManager {
    config: RetryConfig,
}

impl RetryManager {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delay slept after failed attempt `attempt` (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.config.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis((self.config.initial_delay_ms as f64 * factor).round() as u64)
    }

    /// Total number of attempts allowed
    pub fn max_attempts(&self) -> u32 {
        self.config.max_retries + 1
    }

    /// Run `operation` until it succeeds, fails fatally, or the budget is spent.
    ///
    /// `context` names the operation in retry logs.
    pub async fn execute_with_retry<T, F, Fut>(
        &self,
        context: &str,
        mut operation: F,
    ) -> PipelineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PipelineResult<T>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;

        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !error.is_retryable() {
                return Err(error);
            }

            if attempt + 1 >= max_attempts {
                return Err(PipelineError::MaxRetriesExceeded {
                    attempts: max_attempts,
                    source: Box::new(error),
                });
            }

            let delay = self.delay_for_attempt(attempt);
            warn!(
                context = context,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Attempt {} failed, retrying in {}ms",
                attempt + 1,
                delay.as_millis()
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}
