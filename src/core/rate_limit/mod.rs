//! Admission control for outbound synthesis requests
//!
//! [`RateLimiter`] combines three rules:
//! - a token bucket refilled at `requests_per_second`, capped at `burst_limit`
//! - at most `requests_per_second` requests inside any trailing one-second window
//! - a fixed minimum spacing between consecutive requests
//!
//! Callers never get a refusal. [`RateLimiter::wait_for_clearance`] sleeps for
//! exactly the computed deficit and then records the request.
//!
//! [`RateLimiterPool`] round-robins over independent limiters to raise aggregate
//! throughput when several credentials or projects are available.
//!
//! # Example
//!
//! ```rust,ignore
//! use newscast_audio::core::rate_limit::{RateLimitConfig, RateLimiter};
//!
//! let limiter = RateLimiter::new(RateLimitConfig::default());
//! limiter.wait_for_clearance().await;
//! // issue the request
//! ```

mod limiter;
mod pool;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use limiter::{RateLimiter, SAFETY_MARGIN, WINDOW};
pub use pool::RateLimiterPool;

/// Rate limit settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Token refill rate and trailing-window cap
    pub requests_per_second: u32,
    /// Token bucket capacity
    pub burst_limit: u32,
    /// Minimum gap between two consecutive requests
    pub delay_between_requests_ms: u64,
    /// Number of independent limiters in a pool
    pub pool_size: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst_limit: 20,
            delay_between_requests_ms: 100,
            pool_size: 1,
        }
    }
}

impl RateLimitConfig {
    pub fn delay_between_requests(&self) -> Duration {
        Duration::from_millis(self.delay_between_requests_ms)
    }
}

/// Non-mutating snapshot of a limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    pub requests_in_last_second: usize,
    pub can_make_request: bool,
    pub estimated_wait_ms: u64,
}
