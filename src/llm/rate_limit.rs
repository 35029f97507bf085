//! Request and token budget per time window
//!
//! Owned by a provider; shared across concurrent runs through a mutex.

use std::time::Duration;

use tokio::time::Instant;

/// Fixed-window limiter for request count and estimated tokens
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_requests: u32,
    max_tokens: u32,
    window: Duration,
    requests: u32,
    tokens: u32,
    reset_at: Option<Instant>,
}

impl RateLimiter {
    /// Create a limiter with per-minute budgets
    pub fn per_minute(max_requests: u32, max_tokens: u32) -> Self {
        Self::new(max_requests, max_tokens, Duration::from_secs(60))
    }

    pub fn new(max_requests: u32, max_tokens: u32, window: Duration) -> Self {
        Self {
            max_requests,
            max_tokens,
            window,
            requests: 0,
            tokens: 0,
            reset_at: None,
        }
    }

    /// Requests counted in the current window
    pub fn requests(&self) -> u32 {
        self.requests
    }

    /// Tokens counted in the current window
    pub fn tokens(&self) -> u32 {
        self.tokens
    }

    /// Account for a request at `now`.
    ///
    /// Returns how long the caller must wait before sending, or `None` when
    /// the request fits in the current window. When a wait is returned the
    /// counters have already been moved to the next window.
    pub fn reserve(&mut self, now: Instant, estimated_cost: u32) -> Option<Duration> {
        if let Some(reset_at) = self.reset_at {
            if now >= reset_at {
                self.start_window(now);
            }
        } else {
            self.start_window(now);
        }

        // reset_at is always set by start_window above
        let reset_at = self.reset_at.unwrap_or(now);

        let over_requests = self.requests >= self.max_requests;
        let over_tokens = self.tokens.saturating_add(estimated_cost) > self.max_tokens;

        if over_requests || over_tokens {
            let wait = reset_at.saturating_duration_since(now);
            tracing::info!(
                "[RateLimiter] {} limit reached, waiting {:?}",
                if over_requests { "Request" } else { "Token" },
                wait
            );
            self.start_window(reset_at);
            self.record(estimated_cost);
            return Some(wait);
        }

        self.record(estimated_cost);
        None
    }

    /// Wait until a request of `estimated_cost` tokens may be sent
    pub async fn check_and_wait(&mut self, estimated_cost: u32) {
        if let Some(wait) = self.reserve(Instant::now(), estimated_cost) {
            tokio::time::sleep(wait).await;
        }
    }

    fn start_window(&mut self, start: Instant) {
        self.requests = 0;
        self.tokens = 0;
        self.reset_at = Some(start + self.window);
    }

    fn record(&mut self, estimated_cost: u32) {
        self.requests += 1;
        self.tokens = self.tokens.saturating_add(estimated_cost);
    }
}
