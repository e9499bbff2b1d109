//! Per-Provider Token-Bucket Rate Limiter
//!
//! The source cost model incremented a "rate limit" counter per call but
//! never checked it against `rate_limit_per_minute` - this is the proper
//! token bucket that replaces it. Capacity refills continuously; acquiring
//! a token blocks (briefly) rather than failing outright, up to a bounded
//! wait window, after which the caller gets `RateLimited`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::time::sleep;

use crate::constants::rate_limit as rl_constants;
use crate::error::{EnhanceError, Result};

/// A lock-free token bucket. `available` is stored as a fixed-point value
/// (tokens * SCALE) so fractional refill can be represented in an AtomicU64.
pub struct RateLimiter {
    provider_name: String,
    capacity: f64,
    refill_per_ms: f64,
    available_scaled: AtomicU64,
    last_refill_ms: AtomicU64,
    start: Instant,
}

const SCALE: f64 = 1_000_000.0;

impl RateLimiter {
    pub fn new(provider_name: impl Into<String>, per_minute: u32) -> Self {
        let capacity = per_minute.max(1) as f64;
        Self {
            provider_name: provider_name.into(),
            capacity,
            refill_per_ms: capacity / 60_000.0,
            available_scaled: AtomicU64::new((capacity * SCALE) as u64),
            last_refill_ms: AtomicU64::new(0),
            start: Instant::now(),
        }
    }

    pub fn with_default_rate(provider_name: impl Into<String>) -> Self {
        Self::new(provider_name, rl_constants::DEFAULT_PER_MINUTE)
    }

    fn refill(&self) {
        let now_ms = self.start.elapsed().as_millis() as u64;
        loop {
            let last = self.last_refill_ms.load(Ordering::Acquire);
            if now_ms <= last {
                return;
            }
            let elapsed_ms = (now_ms - last) as f64;
            let add_scaled = (elapsed_ms * self.refill_per_ms * SCALE) as u64;

            if self
                .last_refill_ms
                .compare_exchange_weak(last, now_ms, Ordering::Release, Ordering::Relaxed)
                .is_err()
            {
                continue;
            }

            if add_scaled == 0 {
                return;
            }

            let cap_scaled = (self.capacity * SCALE) as u64;
            loop {
                let current = self.available_scaled.load(Ordering::Acquire);
                let new_value = (current + add_scaled).min(cap_scaled);
                if self
                    .available_scaled
                    .compare_exchange_weak(current, new_value, Ordering::Release, Ordering::Relaxed)
                    .is_ok()
                {
                    return;
                }
            }
        }
    }

    /// Attempt to take one token without waiting.
    pub fn try_acquire(&self) -> bool {
        self.refill();
        let one_scaled = SCALE as u64;
        loop {
            let current = self.available_scaled.load(Ordering::Acquire);
            if current < one_scaled {
                return false;
            }
            if self
                .available_scaled
                .compare_exchange_weak(current, current - one_scaled, Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                return true;
            }
        }
    }

    /// Wait up to `rate_limit::MAX_WAIT_MS` for a token; `RateLimited` past that.
    pub async fn acquire(&self) -> Result<()> {
        let deadline = Instant::now() + Duration::from_millis(rl_constants::MAX_WAIT_MS);
        loop {
            if self.try_acquire() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(EnhanceError::RateLimited {
                    provider: self.provider_name.clone(),
                });
            }
            sleep(Duration::from_millis(25)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_bucket_allows_burst_up_to_capacity() {
        let limiter = RateLimiter::new("test", 5);
        for _ in 0..5 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn acquire_fails_past_wait_window_when_exhausted() {
        let limiter = RateLimiter::new("test", 1);
        assert!(limiter.try_acquire());
        let result = limiter.acquire().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn acquire_succeeds_immediately_with_capacity() {
        let limiter = RateLimiter::new("test", 60);
        assert!(limiter.acquire().await.is_ok());
    }
}
