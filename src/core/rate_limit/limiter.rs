use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::debug;

use super::{RateLimitConfig, RateLimitStatus};

/// Length of the trailing request window
pub const WINDOW: Duration = Duration::from_secs(1);

/// Added to every computed wait so the caller lands past the boundary
pub const SAFETY_MARGIN: Duration = Duration::from_millis(10);

/// One sleep normally satisfies every rule; the bound guards against clock oddities.
const MAX_CLEARANCE_ROUNDS: usize = 8;

#[derive(Debug)]
struct LimiterState {
    tokens: f64,
    last_refill: Instant,
    history: VecDeque<Instant>,
    last_request: Option<Instant>,
}

impl LimiterState {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_refill: Instant::now(),
            history: VecDeque::new(),
            last_request: None,
        }
    }

    fn tokens_at(&self, now: Instant, rate: f64, capacity: f64) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        (self.tokens + elapsed * rate).min(capacity)
    }

    fn in_window(&self, now: Instant) -> impl Iterator<Item = &Instant> {
        self.history
            .iter()
            .filter(move |t| now.saturating_duration_since(**t) <= WINDOW)
    }

    /// Zero when a request may proceed at `now`, otherwise the full sleep
    /// including [`SAFETY_MARGIN`].
    fn required_wait(&self, now: Instant, config: &RateLimitConfig) -> Duration {
        let rate = f64::from(config.requests_per_second.max(1));
        let capacity = f64::from(config.burst_limit.max(1));
        let cap = config.requests_per_second.max(1) as usize;

        let recent: Vec<&Instant> = self.in_window(now).collect();
        let window_blocked = recent.len() >= cap;
        let window_deficit = if window_blocked {
            // The entry that must age out for the count to drop below the cap
            let pivot = *recent[recent.len() - cap];
            WINDOW.saturating_sub(now.saturating_duration_since(pivot))
        } else {
            Duration::ZERO
        };

        let spacing = config.delay_between_requests();
        let since_last = self
            .last_request
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or(Duration::MAX);
        let spacing_blocked = since_last < spacing;
        let spacing_deficit = if spacing_blocked {
            spacing - since_last
        } else {
            Duration::ZERO
        };

        let tokens = self.tokens_at(now, rate, capacity);
        let token_blocked = tokens < 1.0;
        let token_deficit = if token_blocked {
            Duration::from_secs_f64((1.0 - tokens) / rate)
        } else {
            Duration::ZERO
        };

        if !(window_blocked || spacing_blocked || token_blocked) {
            return Duration::ZERO;
        }
        window_deficit.max(spacing_deficit).max(token_deficit) + SAFETY_MARGIN
    }

    fn record(&mut self, now: Instant, config: &RateLimitConfig) {
        let rate = f64::from(config.requests_per_second.max(1));
        let capacity = f64::from(config.burst_limit.max(1));
        self.tokens = (self.tokens_at(now, rate, capacity) - 1.0).max(0.0);
        self.last_refill = now;

        while let Some(front) = self.history.front() {
            if now.saturating_duration_since(*front) > WINDOW {
                self.history.pop_front();
            } else {
                break;
            }
        }
        self.history.push_back(now);
        self.last_request = Some(now);
    }
}

/// Token bucket + sliding window + spacing limiter
///
/// Mutating calls are serialized: concurrent callers queue on an internal
/// async lock and are admitted one at a time, so the state has a single writer.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<LimiterState>,
    admission: tokio::sync::Mutex<()>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let capacity = f64::from(config.burst_limit.max(1));
        Self {
            config,
            state: Mutex::new(LimiterState::new(capacity)),
            admission: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Suspend until a request may proceed, then record it.
    pub async fn wait_for_clearance(&self) {
        let _turn = self.admission.lock().await;

        for round in 0..MAX_CLEARANCE_ROUNDS {
            let wait = {
                let mut state = self.state.lock();
                let now = Instant::now();
                let wait = state.required_wait(now, &self.config);
                if wait.is_zero() {
                    state.record(now, &self.config);
                    return;
                }
                wait
            };

            debug!(
                round = round,
                wait_ms = wait.as_millis() as u64,
                "Rate limiter delaying request"
            );
            sleep(wait).await;
        }

        let mut state = self.state.lock();
        state.record(Instant::now(), &self.config);
    }

    pub fn get_status(&self) -> RateLimitStatus {
        let state = self.state.lock();
        let now = Instant::now();
        let wait = state.required_wait(now, &self.config);
        RateLimitStatus {
            requests_in_last_second: state.in_window(now).count(),
            can_make_request: wait.is_zero(),
            estimated_wait_ms: wait.as_millis() as u64,
        }
    }

    /// Clear all history and refill the bucket. Test isolation only.
    pub fn reset(&self) {
        let capacity = f64::from(self.config.burst_limit.max(1));
        *self.state.lock() = LimiterState::new(capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rps: u32, burst: u32, delay_ms: u64) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_second: rps,
            burst_limit: burst,
            delay_between_requests_ms: delay_ms,
            pool_size: 1,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_request_is_immediate() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        let start = Instant::now();
        limiter.wait_for_clearance().await;
        assert_eq!(Instant::now(), start);
        assert_eq!(limiter.get_status().requests_in_last_second, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_never_exceeds_rate() {
        let limiter = RateLimiter::new(config(5, 20, 0));
        let mut stamps = Vec::new();
        for _ in 0..23 {
            limiter.wait_for_clearance().await;
            stamps.push(Instant::now());
        }

        for (i, start) in stamps.iter().enumerate() {
            let in_window = stamps[i..]
                .iter()
                .take_while(|t| t.duration_since(*start) <= WINDOW)
                .count();
            assert!(in_window <= 5, "window starting at #{i} holds {in_window}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_between_consecutive_requests() {
        let limiter = RateLimiter::new(config(100, 100, 150));
        let mut stamps = Vec::new();
        for _ in 0..6 {
            limiter.wait_for_clearance().await;
            stamps.push(Instant::now());
        }
        for pair in stamps.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(150));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_bounded_by_bucket() {
        // Window cap is generous, so the bucket is the binding rule
        let limiter = RateLimiter::new(config(10, 3, 0));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.wait_for_clearance().await;
        }
        assert_eq!(Instant::now(), start, "burst of 3 should be admitted at once");

        // Bucket is empty; one token refills in 100ms
        limiter.wait_for_clearance().await;
        let waited = Instant::now().duration_since(start);
        assert!(waited >= Duration::from_millis(100), "waited {waited:?}");
        assert!(waited < WINDOW, "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_reports_wait_when_blocked() {
        let limiter = RateLimiter::new(config(1, 1, 0));
        limiter.wait_for_clearance().await;

        let status = limiter.get_status();
        assert!(!status.can_make_request);
        assert_eq!(status.requests_in_last_second, 1);
        assert!(status.estimated_wait_ms >= 1000);

        // Reading status twice must not change anything
        assert_eq!(limiter.get_status(), status);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_history() {
        let limiter = RateLimiter::new(config(1, 1, 500));
        limiter.wait_for_clearance().await;
        assert!(!limiter.get_status().can_make_request);

        limiter.reset();
        let status = limiter.get_status();
        assert!(status.can_make_request);
        assert_eq!(status.requests_in_last_second, 0);
        assert_eq!(status.estimated_wait_ms, 0);
    }
}
