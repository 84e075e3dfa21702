//! Rate limiter for WebSocket message handling.
//!
//! Each connection gets a [`FrameLimiter`]: a 10 frames per second burst
//! window and a 100 frames per minute sustained window.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Sliding-window rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    /// Timestamps of recent requests
    timestamps: VecDeque<Instant>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    /// Allow `max_requests` within any `window`
    ///
    /// # Example
    ///
    /// ```
    /// use tp_server::api::rate_limiter::RateLimiter;
    /// use std::time::Duration;
    ///
    /// let mut limiter = RateLimiter::new(2, Duration::from_secs(1));
    /// assert!(limiter.check());
    /// assert!(limiter.check());
    /// assert!(!limiter.check());
    /// ```
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: VecDeque::with_capacity(max_requests),
            max_requests,
            window,
        }
    }

    /// 10 messages per second
    pub fn burst() -> Self {
        Self::new(10, Duration::from_secs(1))
    }

    /// 100 messages per minute
    pub fn sustained() -> Self {
        Self::new(100, Duration::from_secs(60))
    }

    /// Record a request now. Returns `false` if the limit is exceeded.
    pub fn check(&mut self) -> bool {
        self.check_at(Instant::now())
    }

    /// Record a request at `now`
    pub fn check_at(&mut self, now: Instant) -> bool {
        while let Some(ts) = self.timestamps.front() {
            if now.duration_since(*ts) >= self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }

        if self.timestamps.len() >= self.max_requests {
            return false;
        }

        self.timestamps.push_back(now);
        true
    }
}

/// Which window rejected a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limited {
    Burst,
    Sustained,
}

impl Limited {
    pub fn label(self) -> &'static str {
        match self {
            Limited::Burst => "burst",
            Limited::Sustained => "sustained",
        }
    }

    /// Message sent back to the client
    pub fn message(self) -> &'static str {
        match self {
            Limited::Burst => "Rate limit exceeded. Please slow down.",
            Limited::Sustained => "Too many messages. Please wait before sending more.",
        }
    }
}

/// Burst and sustained limits for one connection
#[derive(Debug)]
pub struct FrameLimiter {
    burst: RateLimiter,
    sustained: RateLimiter,
}

impl Default for FrameLimiter {
    fn default() -> Self {
        Self {
            burst: RateLimiter::burst(),
            sustained: RateLimiter::sustained(),
        }
    }
}

impl FrameLimiter {
    pub fn check(&mut self) -> Result<(), Limited> {
        self.check_at(Instant::now())
    }

    pub fn check_at(&mut self, now: Instant) -> Result<(), Limited> {
        if !self.burst.check_at(now) {
            return Err(Limited::Burst);
        }
        if !self.sustained.check_at(now) {
            return Err(Limited::Sustained);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_blocks_over_limit() {
        let mut limiter = RateLimiter::new(3, Duration::from_secs(1));
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at(now));
        }
        assert!(!limiter.check_at(now), "Should block request over limit");
    }

    #[test]
    fn test_rate_limiter_window_slides() {
        let mut limiter = RateLimiter::new(2, Duration::from_millis(100));
        let start = Instant::now();

        assert!(limiter.check_at(start));
        assert!(limiter.check_at(start + Duration::from_millis(50)));
        assert!(!limiter.check_at(start + Duration::from_millis(60)));

        // The first request has aged out, the second has not
        assert!(limiter.check_at(start + Duration::from_millis(100)));
        assert!(!limiter.check_at(start + Duration::from_millis(120)));
    }

    #[test]
    fn test_burst_limiter() {
        let mut limiter = RateLimiter::burst();
        let now = Instant::now();

        for _ in 0..10 {
            assert!(limiter.check_at(now));
        }
        assert!(!limiter.check_at(now), "Burst limiter should block 11th request");
    }

    #[test]
    fn test_frame_limiter_reports_burst_first() {
        let mut limiter = FrameLimiter::default();
        let now = Instant::now();

        for _ in 0..10 {
            assert!(limiter.check_at(now).is_ok());
        }
        assert_eq!(limiter.check_at(now), Err(Limited::Burst));
    }

    #[test]
    fn test_frame_limiter_sustained_window() {
        let mut limiter = FrameLimiter::default();
        let start = Instant::now();

        // Ten frames a second stays under the burst limit but hits 100/min
        for i in 0..100u64 {
            let at = start + Duration::from_millis(i * 100);
            assert!(limiter.check_at(at).is_ok(), "frame {i} should pass");
        }
        let at = start + Duration::from_millis(10_000);
        assert_eq!(limiter.check_at(at), Err(Limited::Sustained));

        // A minute after the first frame there is room again
        let at = start + Duration::from_secs(60);
        assert!(limiter.check_at(at).is_ok());
    }

    #[test]
    fn test_limited_messages() {
        assert_eq!(Limited::Burst.label(), "burst");
        assert!(Limited::Sustained.message().contains("Too many messages"));
    }
}
