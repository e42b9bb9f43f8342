use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Minimum spacing between store requests, shared by every worker.
///
/// The lock is held while waiting, so concurrent callers queue up and each
/// one gets its own slot.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    next_allowed: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_allowed: Mutex::new(None),
        }
    }

    /// A limiter that never waits.
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Wait until a request may be sent, then reserve the next slot.
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut next_allowed = self.next_allowed.lock().await;
        if let Some(at) = *next_allowed {
            if at > Instant::now() {
                sleep_until(at).await;
            }
        }
        *next_allowed = Some(Instant::now() + self.min_interval);
    }
}
