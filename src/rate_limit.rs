//! Process-wide upstream cooldown gate
//!
//! Open Trivia DB allows one request per IP every 5 seconds. Every upstream
//! attempt, from any request and any retry, passes through one shared
//! [`RateLimiter`] so that spacing holds no matter how many callers miss the
//! cache at once.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Default spacing between upstream calls
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(5000);

/// Serializing gate that enforces a minimum interval between upstream calls
#[derive(Debug)]
pub struct RateLimiter {
    cooldown: Duration,
    /// Instant of the most recent call or rate-limit signal
    last_call: Mutex<Option<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl RateLimiter {
    /// Creates a limiter with the given cooldown
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_call: Mutex::new(None),
        }
    }

    /// Returns the configured cooldown
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Waits until the cooldown has elapsed, then stamps a new call
    ///
    /// The lock is held across the wait, so concurrent callers queue up and
    /// each one observes the timestamp left by the caller before it.
    pub async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;

        if let Some(last) = *last_call {
            let elapsed = last.elapsed();
            if elapsed < self.cooldown {
                let wait = self.cooldown - elapsed;
                debug!(
                    wait_ms = %wait.as_millis(),
                    "Waiting to respect upstream rate limit"
                );
                sleep(wait).await;
            }
        }

        *last_call = Some(Instant::now());
    }

    /// Records that upstream just signalled a rate limit
    ///
    /// The next [`acquire`](Self::acquire) waits a full cooldown from now.
    pub async fn record_rate_limited(&self) {
        *self.last_call.lock().await = Some(Instant::now());
    }

    /// Instant of the last recorded call, if any
    pub async fn last_call(&self) -> Option<Instant> {
        *self.last_call.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_first_acquire_does_not_wait() {
        let limiter = RateLimiter::default();
        let start = Instant::now();

        limiter.acquire().await;

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(limiter.last_call().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_acquire_waits_full_cooldown() {
        let limiter = RateLimiter::default();

        limiter.acquire().await;
        let first = Instant::now();
        limiter.acquire().await;

        assert!(first.elapsed() >= DEFAULT_COOLDOWN);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_only_waits_the_remainder() {
        let limiter = RateLimiter::new(Duration::from_millis(5000));

        limiter.acquire().await;
        sleep(Duration::from_millis(3000)).await;

        let before = Instant::now();
        limiter.acquire().await;
        let waited = before.elapsed();

        assert!(waited >= Duration::from_millis(2000));
        assert!(waited < Duration::from_millis(2500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_cooldown_elapsed() {
        let limiter = RateLimiter::new(Duration::from_millis(100));

        limiter.acquire().await;
        sleep(Duration::from_millis(150)).await;

        let before = Instant::now();
        limiter.acquire().await;

        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_rate_limited_pushes_next_call_back() {
        let limiter = RateLimiter::default();

        limiter.acquire().await;
        sleep(Duration::from_millis(4000)).await;
        limiter.record_rate_limited().await;

        let before = Instant::now();
        limiter.acquire().await;

        assert!(before.elapsed() >= DEFAULT_COOLDOWN);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_are_spaced_by_cooldown() {
        let limiter = Arc::new(RateLimiter::default());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut stamps = Vec::new();
        for handle in handles {
            stamps.push(handle.await.expect("task should not panic"));
        }
        stamps.sort();

        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= DEFAULT_COOLDOWN);
        }
    }
}
