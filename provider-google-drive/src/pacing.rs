//! Minimum-spacing request pacer
//!
//! Drive's per-user quota bans aggressive clients for long stretches, so every
//! call waits until `min_delay` has passed since the previous one. There is no
//! burst credit: an idle period does not let later calls go out back to back.

use core_async::sync::Mutex;
use core_async::time::{sleep, Duration, Instant};
use tracing::trace;

pub struct RequestPacer {
    min_delay: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_call: Mutex::new(None),
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Wait for the next slot and claim it.
    ///
    /// The lock is held across the sleep so concurrent callers queue up
    /// behind each other instead of firing together once the delay elapses.
    pub async fn wait(&self) {
        let mut last_call = self.last_call.lock().await;

        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_delay {
                let remaining = self.min_delay - elapsed;
                trace!(wait_ms = remaining.as_millis() as u64, "Pacing Drive request");
                sleep(remaining).await;
            }
        }

        *last_call = Some(Instant::now());
    }
}
