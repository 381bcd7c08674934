//! Sliding-window request limiter for agent endpoints

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Allows at most `max_requests` acquisitions in any `window`
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    recent: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Limit to `requests_per_minute`; zero disables limiting
    pub fn new(requests_per_minute: u32) -> Self {
        Self::with_window(requests_per_minute, Duration::from_secs(60))
    }

    pub fn with_window(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            recent: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until a request may be sent, then record it
    pub async fn acquire(&self) {
        if self.max_requests == 0 {
            return;
        }

        loop {
            let wait = {
                let mut recent = self.recent.lock().await;
                let now = Instant::now();
                Self::evict(&mut recent, now, self.window);

                if recent.len() < self.max_requests as usize {
                    recent.push_back(now);
                    return;
                }

                // at capacity: wait for the oldest request to leave the window
                recent
                    .front()
                    .map(|&oldest| self.window.saturating_sub(now.duration_since(oldest)))
                    .unwrap_or_default()
                    + Duration::from_millis(10)
            };

            tracing::debug!("Rate limit reached, waiting {}ms", wait.as_millis());
            tokio::time::sleep(wait).await;
        }
    }

    /// Requests recorded within the current window
    pub async fn recent_requests(&self) -> usize {
        let mut recent = self.recent.lock().await;
        Self::evict(&mut recent, Instant::now(), self.window);
        recent.len()
    }

    fn evict(recent: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(&front) = recent.front() {
            if now.duration_since(front) >= window {
                recent.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_basic() {
        let limiter = RateLimiter::new(5);

        // Should be able to make 5 requests immediately
        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert_eq!(limiter.recent_requests().await, 5);
    }

    #[tokio::test]
    async fn test_rate_limiter_waits_for_window() {
        let limiter = RateLimiter::with_window(2, Duration::from_millis(100));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_zero_rate_is_unlimited() {
        let limiter = RateLimiter::new(0);
        for _ in 0..100 {
            limiter.acquire().await;
        }
        assert_eq!(limiter.recent_requests().await, 0);
    }
}
