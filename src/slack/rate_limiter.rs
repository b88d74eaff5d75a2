//! Rate limiter for Slack Web API posts.
//!
//! Spaces out outgoing messages so the bot stays under Slack's posting
//! limits, and backs off when Slack answers with HTTP 429.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Enforces a minimum interval between posts.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum duration between allowed posts.
    min_interval: Duration,

    /// Earliest moment the next post may go out.
    next_allowed: Mutex<Instant>,
}

impl RateLimiter {
    /// Creates a new rate limiter with the specified minimum interval.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_allowed: Mutex::new(Instant::now()),
        }
    }

    /// Creates a rate limiter from milliseconds.
    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Waits until a post is allowed, then reserves the slot.
    ///
    /// Returns the duration waited (0 if no wait was needed).
    pub async fn wait_and_acquire(&self) -> Duration {
        let mut next = self.next_allowed.lock().await;

        let wait_duration = next.saturating_duration_since(Instant::now());
        if !wait_duration.is_zero() {
            debug!("Rate limiter: waiting {:?} before next post", wait_duration);
            tokio::time::sleep(wait_duration).await;
        }

        *next = Instant::now() + self.min_interval;
        wait_duration
    }

    /// Pushes the next allowed post back after a `Retry-After` response.
    pub async fn defer(&self, retry_after: Duration) {
        warn!("Slack asked us to back off for {:?}", retry_after);
        let mut next = self.next_allowed.lock().await;
        let until = Instant::now() + retry_after;
        if until > *next {
            *next = until;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_first_post() {
        let limiter = RateLimiter::from_millis(1000);
        let waited = limiter.wait_and_acquire().await;
        assert_eq!(waited, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_rate_limiter_subsequent_post() {
        let limiter = RateLimiter::new(Duration::from_millis(100));

        limiter.wait_and_acquire().await;
        let waited = limiter.wait_and_acquire().await;
        assert!(waited > Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_rate_limiter_defer() {
        let limiter = RateLimiter::new(Duration::ZERO);
        limiter.defer(Duration::from_millis(200)).await;

        let waited = limiter.wait_and_acquire().await;
        assert!(waited > Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_rate_limiter_defer_never_shortens() {
        let limiter = RateLimiter::new(Duration::from_millis(200));
        limiter.wait_and_acquire().await;
        limiter.defer(Duration::ZERO).await;

        let waited = limiter.wait_and_acquire().await;
        assert!(waited > Duration::from_millis(100));
    }
}
