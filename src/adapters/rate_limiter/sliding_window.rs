//! Sliding-window request throttle.
//!
//! Cooperative, single-flow throttle for third-party APIs. Tracks the
//! instants of recent requests. When the window already holds
//! `max_requests`, `acquire` sleeps until the oldest one leaves it.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
pub struct SlidingWindowThrottle {
    max_requests: usize,
    window: Duration,
    recent: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowThrottle {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            recent: Mutex::new(VecDeque::new()),
        }
    }

    /// Waits for a free slot and claims it.
    pub async fn acquire(&self) {
        let mut recent = self.recent.lock().await;
        loop {
            let now = Instant::now();
            while recent
                .front()
                .is_some_and(|at| now.duration_since(*at) >= self.window)
            {
                recent.pop_front();
            }

            if recent.len() < self.max_requests {
                recent.push_back(now);
                return;
            }

            let Some(oldest) = recent.front().copied() else {
                continue;
            };
            let wait = self.window.saturating_sub(now.duration_since(oldest));
            debug!(wait_ms = wait.as_millis() as u64, "Throttle window full, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Requests currently counted in the window.
    pub async fn in_flight(&self) -> usize {
        let now = Instant::now();
        self.recent
            .lock()
            .await
            .iter()
            .filter(|at| now.duration_since(**at) < self.window)
            .count()
    }
}
