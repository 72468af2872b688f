//! Sliding-window rate limiter for job starts.
//!
//! At most `max` acquisitions succeed in any window of length `window`.
//! A limiter with `max == 0` never limits.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Sliding-window limiter.
#[derive(Debug)]
pub struct RateLimiter {
    max: usize,
    window: Duration,
    starts: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Allow `max` acquisitions per `window`.
    #[must_use]
    pub fn new(max: usize, window: Duration) -> Self {
        Self {
            max,
            window,
            starts: Mutex::new(VecDeque::with_capacity(max)),
        }
    }

    /// Limiter that never blocks.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Take a slot now, or return how long until one frees up.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        if self.max == 0 {
            return Ok(());
        }

        let now = Instant::now();
        let mut starts = self.starts.lock();
        while let Some(&oldest) = starts.front() {
            if now.duration_since(oldest) >= self.window {
                starts.pop_front();
            } else {
                break;
            }
        }

        if starts.len() < self.max {
            starts.push_back(now);
            return Ok(());
        }

        let oldest = starts.front().copied().unwrap_or(now);
        Err(self.window.saturating_sub(now.duration_since(oldest)))
    }

    /// Wait until a slot is free and take it.
    pub async fn acquire(&self) {
        while let Err(wait) = self.try_acquire() {
            tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
        }
    }

    /// Acquisitions inside the current window.
    #[must_use]
    pub fn in_window(&self) -> usize {
        let now = Instant::now();
        self.starts
            .lock()
            .iter()
            .filter(|&&start| now.duration_since(start) < self.window)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_max_then_reports_wait() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_ok());

        let wait = limiter.try_acquire().unwrap_err();
        assert!(wait > Duration::from_secs(59));
        assert_eq!(limiter.in_window(), 2);
    }

    #[test]
    fn unlimited_never_blocks() {
        let limiter = RateLimiter::unlimited();
        for _ in 0..1000 {
            assert!(limiter.try_acquire().is_ok());
        }
    }

    #[tokio::test]
    async fn slot_frees_after_window() {
        let limiter = RateLimiter::new(1, Duration::from_millis(50));
        limiter.acquire().await;
        assert!(limiter.try_acquire().is_err());

        let started = Instant::now();
        limiter.acquire().await;
        assert!(started.elapsed() >= Duration::from_millis(40));
    }
}
