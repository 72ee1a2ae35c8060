//! Consecutive-failure circuit breaker
//!
//! Drive answers a burst of quota errors with longer and longer bans. Once a
//! pass has failed `threshold` files in a row and the latest failure was a
//! rate limit, the breaker pauses the pass for `cooldown` and starts counting
//! again from zero. Successes reset the counter.

use bridge_traits::error::ErrorKind;
use core_async::sync::CancellationToken;
use core_async::time::{sleep, Duration};
use tracing::warn;

use crate::error::{Result, SyncError};

#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    consecutive_failures: u32,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
            consecutive_failures: 0,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Count a failure and cool down if it trips the breaker.
    ///
    /// Returns `true` when a cooldown was taken.
    ///
    /// # Errors
    /// `SyncError::Cancelled` when `cancel` fires during the cooldown.
    pub async fn record_failure(
        &mut self,
        kind: ErrorKind,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        self.consecutive_failures += 1;

        if kind != ErrorKind::RateLimited || self.consecutive_failures < self.threshold {
            return Ok(false);
        }

        warn!(
            consecutive_failures = self.consecutive_failures,
            cooldown_secs = self.cooldown.as_secs(),
            "Persistent rate limiting, pausing sync"
        );
        sleep_or_cancel(self.cooldown, cancel).await?;
        self.consecutive_failures = 0;
        Ok(true)
    }
}

/// Sleep unless `cancel` fires first.
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    core_async::select! {
        biased;
        _ = cancel.cancelled() => Err(SyncError::Cancelled),
        _ = sleep(duration) => Ok(()),
    }
}
