//! Retry policy for upstream fetches
//!
//! A fixed-delay retry loop with one special case: after an HTTP 429 the
//! policy waits the upstream's documented cooldown instead of the base delay
//! and feeds the failure time back into the [`RateLimiter`].

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::data::UpstreamError;
use crate::rate_limit::RateLimiter;

/// Configuration for the retry loop
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Wait after an ordinary failure
    pub base_delay: Duration,
    /// Wait after a rate-limited failure
    pub rate_limit_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            rate_limit_delay: Duration::from_millis(5000),
        }
    }
}

impl RetryConfig {
    /// Builder: set max attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Builder: set base delay
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Builder: set the wait used after a 429
    pub fn with_rate_limit_delay(mut self, rate_limit_delay: Duration) -> Self {
        self.rate_limit_delay = rate_limit_delay;
        self
    }
}

/// Error returned when every attempt failed
#[derive(Debug, Error)]
pub enum RetryError {
    #[error("All {attempts} attempts failed, last error: {last_error}")]
    Exhausted {
        attempts: u32,
        last_error: UpstreamError,
    },
}

impl RetryError {
    /// Number of attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// Get the last underlying error
    pub fn into_inner(self) -> UpstreamError {
        match self {
            RetryError::Exhausted { last_error, .. } => last_error,
        }
    }
}

/// Runs upstream operations under the retry policy
#[derive(Clone, Debug, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Current configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute `operation` until it succeeds or the attempt budget runs out
    ///
    /// Each attempt first passes the rate limiter gate. There is no wait after
    /// the final attempt; its error is returned inside [`RetryError::Exhausted`].
    pub async fn execute<F, Fut, T>(
        &self,
        limiter: &RateLimiter,
        mut operation: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            limiter.acquire().await;
            info!(attempt = %attempt, "Fetching from Open Trivia DB");

            let error = match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        info!(attempt = %attempt, "Succeeded after retries");
                    }
                    return Ok(result);
                }
                Err(e) => e,
            };

            warn!(
                attempt = %attempt,
                max_attempts = %max_attempts,
                error = %error,
                "Upstream attempt failed"
            );

            let wait = if error.is_rate_limited() {
                limiter.record_rate_limited().await;
                self.config.rate_limit_delay
            } else {
                self.config.base_delay
            };

            if attempt >= max_attempts {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last_error: error,
                });
            }

            sleep(wait).await;
        }
    }
}
