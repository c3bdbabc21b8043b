//! Reddit's advisory rate limit.
//!
//! Reddit reports the remaining budget of the current window in the
//! `X-Ratelimit-*` response headers. When one request or fewer is left, the
//! next caller sleeps until the window resets.

use crate::cancel::CancelToken;
use crate::error::Result;
use log::info;
use reqwest::header::HeaderMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";
pub const USED_HEADER: &str = "x-ratelimit-used";

/// The last observed rate-limit window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitState {
    pub remaining: f64,
    pub used: u64,
    pub reset_at: Instant,
}

impl RateLimitState {
    /// Parse the rate-limit headers. Returns `None` unless both the remaining
    /// budget and the reset window are present and numeric.
    pub fn from_headers(headers: &HeaderMap, now: Instant) -> Option<Self> {
        let number = |name: &str| -> Option<f64> {
            headers
                .get(name)?
                .to_str()
                .ok()?
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite() && *n >= 0.0)
        };
        let remaining = number(REMAINING_HEADER)?;
        // windows are ten minutes; clamp absurd values
        let reset = number(RESET_HEADER)?.min(86_400.0);
        let used = number(USED_HEADER).unwrap_or(0.0) as u64;

        Some(Self {
            remaining,
            used,
            reset_at: now + Duration::from_secs_f64(reset),
        })
    }

    /// How long a caller must wait before sending, as of `now`.
    pub fn delay(&self, now: Instant) -> Duration {
        if self.remaining > 1.0 {
            Duration::ZERO
        } else {
            self.reset_at.saturating_duration_since(now)
        }
    }
}

/// Shared rate-limit tracker. Every HTTP call brackets itself with
/// [`pre_request`](RateLimiter::pre_request) and
/// [`post_response`](RateLimiter::post_response).
#[derive(Debug, Default)]
pub struct RateLimiter {
    state: Mutex<Option<RateLimitState>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until a request may be sent.
    ///
    /// The state lock is held for the whole sleep, so only one caller sleeps
    /// for a window at a time; the others queue on the lock and re-evaluate
    /// once it is released.
    pub async fn pre_request(&self, cancel: &CancelToken) -> Result<()> {
        let state = cancel.run(self.state.lock()).await?;
        let delay = match *state {
            Some(ref window) => window.delay(Instant::now()),
            None => Duration::ZERO,
        };
        if !delay.is_zero() {
            info!("Rate limit budget exhausted, sleeping {:.2?}", delay);
            cancel.sleep(delay).await?;
        }
        Ok(())
    }

    /// Replace the tracked window with what `headers` report. Responses
    /// without rate-limit headers leave the state untouched.
    pub async fn post_response(&self, headers: &HeaderMap) {
        if let Some(window) = RateLimitState::from_headers(headers, Instant::now()) {
            *self.state.lock().await = Some(window);
        }
    }

    pub async fn snapshot(&self) -> Option<RateLimitState> {
        *self.state.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(remaining: &str, reset: &str, used: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(REMAINING_HEADER, HeaderValue::from_str(remaining).unwrap());
        headers.insert(RESET_HEADER, HeaderValue::from_str(reset).unwrap());
        headers.insert(USED_HEADER, HeaderValue::from_str(used).unwrap());
        headers
    }

    #[test]
    fn delay_rules() {
        let now = Instant::now();
        let plenty = RateLimitState::from_headers(&headers("598.0", "300", "2"), now).unwrap();
        assert_eq!(plenty.delay(now), Duration::ZERO);

        let last = RateLimitState::from_headers(&headers("1", "12", "599"), now).unwrap();
        assert_eq!(last.delay(now), Duration::from_secs(12));
        assert_eq!(last.used, 599);
    }

    #[test]
    fn partial_headers_are_ignored() {
        let mut partial = HeaderMap::new();
        partial.insert(REMAINING_HEADER, HeaderValue::from_static("0"));
        assert!(RateLimitState::from_headers(&partial, Instant::now()).is_none());
        assert!(RateLimitState::from_headers(&headers("abc", "1", "1"), Instant::now()).is_none());
    }

    #[tokio::test]
    async fn no_observation_means_no_delay() {
        let limiter = RateLimiter::new();
        let started = Instant::now();
        limiter.pre_request(&CancelToken::new()).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn exhausted_budget_sleeps_for_reset_window() {
        let limiter = RateLimiter::new();
        limiter.post_response(&headers("5", "60", "1")).await;
        limiter.post_response(&headers("0", "1", "600")).await;

        let started = Instant::now();
        limiter.pre_request(&CancelToken::new()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(990));
    }

    #[tokio::test]
    async fn missing_headers_keep_previous_state() {
        let limiter = RateLimiter::new();
        limiter.post_response(&headers("10", "30", "4")).await;
        limiter.post_response(&HeaderMap::new()).await;
        let state = limiter.snapshot().await.unwrap();
        assert_eq!(state.remaining, 10.0);
        assert_eq!(state.used, 4);
    }

    #[tokio::test]
    async fn cancellation_during_sleep_leaves_state_intact() {
        let limiter = RateLimiter::new();
        limiter.post_response(&headers("0", "30", "600")).await;
        let token = CancelToken::new();
        token.cancel();

        let err = limiter.pre_request(&token).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(limiter.snapshot().await.unwrap().remaining, 0.0);
    }
}
