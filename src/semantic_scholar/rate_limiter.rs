// Request pacing for the Graph API.
//
// Semantic Scholar allows roughly one request per second without a key.
// Every caller reserves the next free slot under the lock and then sleeps
// until that slot outside of it, so concurrent callers queue up one interval
// apart instead of all waking at once.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Spaces requests at least `interval` apart.
#[derive(Clone)]
pub struct RateLimiter {
    interval: Duration,
    /// Earliest instant the next request may start
    next_slot: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn new(requests_per_second: f64) -> Self {
        Self::with_interval(Duration::from_secs_f64(1.0 / requests_per_second))
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Wait for this caller's slot.
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(at) if at > now => at,
                _ => now,
            };
            *next = Some(slot + self.interval);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}
