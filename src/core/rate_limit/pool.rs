use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use super::{RateLimitConfig, RateLimitStatus, RateLimiter};

/// Round-robin pool of independent limiters
///
/// Each instance keeps its own state. A caller is admitted through the first
/// instance (starting at the rotation cursor) that is ready right now; if none
/// is ready it waits on the instance at the cursor.
#[derive(Debug)]
pub struct RateLimiterPool {
    limiters: Vec<RateLimiter>,
    cursor: AtomicUsize,
}

impl RateLimiterPool {
    /// Build `config.pool_size` limiters (at least one)
    pub fn new(config: RateLimitConfig) -> Self {
        let size = config.pool_size.max(1);
        Self::with_size(config, size)
    }

    pub fn with_size(config: RateLimitConfig, size: usize) -> Self {
        let limiters = (0..size.max(1))
            .map(|_| RateLimiter::new(config.clone()))
            .collect();
        Self {
            limiters,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }

    /// Wait for clearance on some instance. Returns the index that admitted the request.
    pub async fn wait_for_clearance(&self) -> usize {
        let count = self.limiters.len();
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % count;

        for offset in 0..count {
            let index = (start + offset) % count;
            if self.limiters[index].get_status().can_make_request {
                self.limiters[index].wait_for_clearance().await;
                return index;
            }
        }

        debug!(limiter = start, "No limiter ready, waiting on next in rotation");
        self.limiters[start].wait_for_clearance().await;
        start
    }

    /// Per-instance snapshots
    pub fn statuses(&self) -> Vec<RateLimitStatus> {
        self.limiters.iter().map(RateLimiter::get_status).collect()
    }

    /// Aggregate snapshot: total recent requests, ready if any instance is ready,
    /// shortest wait otherwise.
    pub fn get_status(&self) -> RateLimitStatus {
        let statuses = self.statuses();
        let can_make_request = statuses.iter().any(|s| s.can_make_request);
        RateLimitStatus {
            requests_in_last_second: statuses.iter().map(|s| s.requests_in_last_second).sum(),
            can_make_request,
            estimated_wait_ms: if can_make_request {
                0
            } else {
                statuses.iter().map(|s| s.estimated_wait_ms).min().unwrap_or(0)
            },
        }
    }

    pub fn reset(&self) {
        for limiter in &self.limiters {
            limiter.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn single_shot() -> RateLimitConfig {
        RateLimitConfig {
            requests_per_second: 1,
            burst_limit: 1,
            delay_between_requests_ms: 0,
            pool_size: 3,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_spreads_requests_across_instances() {
        let pool = RateLimiterPool::new(single_shot());
        assert_eq!(pool.len(), 3);

        let start = Instant::now();
        let mut used = Vec::new();
        for _ in 0..3 {
            used.push(pool.wait_for_clearance().await);
        }
        used.sort_unstable();
        assert_eq!(used, vec![0, 1, 2]);
        assert_eq!(Instant::now(), start, "three ready instances admit without waiting");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_prefers_ready_instance() {
        let pool = RateLimiterPool::new(single_shot());
        // Exhaust instance 0 and 1 through the rotation
        assert_eq!(pool.wait_for_clearance().await, 0);
        assert_eq!(pool.wait_for_clearance().await, 1);

        // Cursor now points at 2; move it back onto a busy instance
        pool.cursor.store(0, Ordering::Relaxed);
        let start = Instant::now();
        assert_eq!(pool.wait_for_clearance().await, 2);
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_waits_on_cursor_instance_when_none_ready() {
        let pool = RateLimiterPool::new(single_shot());
        for _ in 0..3 {
            pool.wait_for_clearance().await;
        }
        assert!(!pool.get_status().can_make_request);

        let start = Instant::now();
        let index = pool.wait_for_clearance().await;
        assert_eq!(index, 0);
        assert!(Instant::now().duration_since(start) >= std::time::Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_status_aggregates() {
        let pool = RateLimiterPool::new(single_shot());
        pool.wait_for_clearance().await;
        let status = pool.get_status();
        assert_eq!(status.requests_in_last_second, 1);
        assert!(status.can_make_request);

        pool.reset();
        assert_eq!(pool.get_status().requests_in_last_second, 0);
    }
}
