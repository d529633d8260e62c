//! Client-side request limiter shared by every call to the catalog host.
//!
//! Enforces a minimum spacing between requests (per-second ceiling) and a
//! sliding one-minute window (per-minute ceiling).

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

const WINDOW: Duration = Duration::from_secs(60);

/// Longest spacing between two requests
const MAX_INTERVAL: Duration = Duration::from_secs(3600);

/// Upper bound for the window's preallocated capacity
const MAX_PREALLOCATED: usize = 1024;

/// Request limiter with per-second and per-minute ceilings
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum gap between two requests; zero disables spacing
    min_interval: Duration,
    /// Maximum requests in any 60 s window; zero disables the window
    max_per_minute: usize,
    last_request: Option<Instant>,
    recent_requests: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(max_per_second: f64, max_per_minute: u32) -> Self {
        let min_interval = if max_per_second > 0.0 && max_per_second.is_finite() {
            Duration::try_from_secs_f64(1.0 / max_per_second)
                .unwrap_or(MAX_INTERVAL)
                .min(MAX_INTERVAL)
        } else {
            Duration::ZERO
        };

        let max_per_minute = max_per_minute as usize;

        Self {
            min_interval,
            max_per_minute,
            last_request: None,
            recent_requests: VecDeque::with_capacity(max_per_minute.min(MAX_PREALLOCATED)),
        }
    }

    /// A limiter that never waits
    pub fn unlimited() -> Self {
        Self::new(0.0, 0)
    }

    fn prune(&mut self, now: Instant) {
        while self
            .recent_requests
            .front()
            .is_some_and(|&t| now.duration_since(t) >= WINDOW)
        {
            self.recent_requests.pop_front();
        }
    }

    /// Wait until a request may be sent, then record it
    pub async fn acquire(&mut self) {
        let now = Instant::now();
        self.prune(now);

        let mut ready_at = now;

        if self.max_per_minute > 0 && self.recent_requests.len() >= self.max_per_minute {
            // The slot frees up once the request that fills the window ages out
            let blocking = self.recent_requests[self.recent_requests.len() - self.max_per_minute];
            ready_at = ready_at.max(blocking + WINDOW);
        }

        if let Some(last) = self.last_request {
            ready_at = ready_at.max(last + self.min_interval);
        }

        if ready_at > now {
            debug!(
                wait_ms = (ready_at - now).as_millis() as u64,
                "Request limiter: waiting"
            );
            sleep_until(ready_at).await;
        }

        let request_time = Instant::now();
        self.last_request = Some(request_time);
        if self.max_per_minute > 0 {
            self.recent_requests.push_back(request_time);
        }
    }

    /// Requests sent in the last minute
    pub fn current_minute_count(&mut self) -> usize {
        self.prune(Instant::now());
        self.recent_requests.len()
    }
}
