//! Rate limiting for probe dispatch.
//!
//! Token bucket limiting on the dispatch path, to control scan pace and
//! avoid flooding intermediate networks.

use governor::{Quota, RateLimiter as GovLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// A shared probes-per-second limiter for the worker pool.
pub struct RateLimiter {
    limiter: Arc<
        GovLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
}

impl RateLimiter {
    /// Create a limiter allowing `rate` probes per second.
    ///
    /// # Panics
    /// Panics if rate is 0. Use `Option<RateLimiter>` for optional limiting.
    pub fn new(rate: u32) -> Self {
        let rate = NonZeroU32::new(rate).expect("rate must be > 0");
        let quota = Quota::per_second(rate);
        let limiter = GovLimiter::direct(quota);

        Self {
            limiter: Arc::new(limiter),
        }
    }

    /// Wait until the next probe may be dispatched.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }
}

impl Clone for RateLimiter {
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_high_rate_does_not_block() {
        let limiter = RateLimiter::new(10_000);
        for _ in 0..10 {
            limiter.wait().await;
        }
    }

    #[test]
    #[should_panic(expected = "rate must be > 0")]
    fn test_zero_rate_panics() {
        let _ = RateLimiter::new(0);
    }
}
