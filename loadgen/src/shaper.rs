use core::time::Duration;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tokio::time::Instant;

use crate::shutdown::ShutdownRx;

/// Minimum time a waiter sleeps before polling the bucket again.
const MIN_WAIT: Duration = Duration::from_millis(1);

#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Shutdown was broadcast while waiting for a token.
    #[error("rate limiter wait cancelled")]
    Cancelled,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    prev_ts: Instant,
}

/// A token-bucket rate limiter shared by all workers.
///
/// Tokens are refilled at `rate` per second, up to `rate` tokens of burst.
/// The bucket starts empty, so the first second of a run is not a burst.
#[derive(Debug)]
pub struct RateLimiter {
    rate: u64,
    burst_size: u64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(rate: u64) -> Self {
        let bucket = Bucket { tokens: 0.0, prev_ts: Instant::now() };

        Self {
            rate,
            burst_size: rate,
            bucket: Mutex::new(bucket),
        }
    }

    /// Returns the refill rate, in tokens per second.
    #[inline]
    pub fn rate(&self) -> u64 {
        self.rate
    }

    /// Waits until a single token is available and takes it.
    ///
    /// Fails with [`RateLimitError::Cancelled`] once shutdown is broadcast,
    /// whether the caller is already waiting or not.
    pub async fn acquire(&self, shutdown: &mut ShutdownRx) -> Result<(), RateLimitError> {
        loop {
            if shutdown.is_cancelled() {
                return Err(RateLimitError::Cancelled);
            }

            // No tokens are ever granted, so just wait to be cancelled.
            if self.rate == 0 {
                shutdown.cancelled().await;
                return Err(RateLimitError::Cancelled);
            }

            let wait = match self.try_take() {
                Ok(()) => return Ok(()),
                Err(wait) => wait,
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.cancelled() => {
                    return Err(RateLimitError::Cancelled);
                }
            }
        }
    }

    /// Refills the bucket and tries to take one token from it.
    ///
    /// On failure returns the time after which the next token is expected.
    fn try_take(&self) -> Result<(), Duration> {
        let now = Instant::now();
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);

        let elapsed = now.saturating_duration_since(bucket.prev_ts);
        bucket.tokens += self.rate as f64 * elapsed.as_secs_f64();
        bucket.tokens = bucket.tokens.min(self.burst_size as f64);
        bucket.prev_ts = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Ok(());
        }

        let missing = 1.0 - bucket.tokens;
        let wait = Duration::from_secs_f64(missing / self.rate as f64);

        Err(wait.max(MIN_WAIT))
    }
}
