//! Exponential backoff between job attempts.
//!
//! The delay after failed attempt `n` (1-based) is
//! `base * multiplier^(n-1)`, capped at `max_backoff`, with optional
//! symmetric jitter. With the defaults a job with base 1s waits 1s then 2s.
//!
//! # Example
//!
//! ```rust
//! use order_engine::queue::BackoffPolicy;
//! use std::time::Duration;
//!
//! let policy = BackoffPolicy::exponential(Duration::from_millis(1000));
//! assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
//! assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
//! ```

use std::time::Duration;

use rand::Rng;

/// Backoff configuration for retried jobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Delay after the first failed attempt (default: 1s).
    pub base: Duration,
    /// Upper bound on any delay (default: 5m).
    pub max_backoff: Duration,
    /// Growth factor per attempt (default: 2.0).
    pub multiplier: f64,
    /// Jitter factor for randomization (default: 0.0, 0.2 = ±20%).
    pub jitter_factor: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::exponential(Duration::from_secs(1))
    }
}

impl BackoffPolicy {
    /// Doubling backoff from `base` without jitter.
    #[must_use]
    pub const fn exponential(base: Duration) -> Self {
        Self {
            base,
            max_backoff: Duration::from_secs(300),
            multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }

    /// Set the jitter factor.
    #[must_use]
    pub const fn with_jitter(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor;
        self
    }

    /// Set the delay cap.
    #[must_use]
    pub const fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.calculate_base_backoff_ms(attempt);
        let jittered_ms = self.apply_jitter(base_ms);
        Duration::from_millis(jittered_ms.min(self.max_backoff_ms()))
    }

    fn max_backoff_ms(&self) -> u64 {
        u64::try_from(self.max_backoff.as_millis()).unwrap_or(u64::MAX)
    }

    /// Exponential backoff without jitter.
    fn calculate_base_backoff_ms(&self, attempt: u32) -> u64 {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let multiplier = self.multiplier.powi(exponent);
        let base_ms = u64::try_from(self.base.as_millis()).unwrap_or(u64::MAX);
        let backoff = (base_ms as f64 * multiplier) as u64;
        backoff.min(self.max_backoff_ms())
    }

    /// Random value in [backoff * (1 - jitter), backoff * (1 + jitter)].
    fn apply_jitter(&self, backoff_ms: u64) -> u64 {
        if self.jitter_factor <= 0.0 || backoff_ms == 0 {
            return backoff_ms;
        }
        let jitter_range = backoff_ms as f64 * self.jitter_factor;
        let min = (backoff_ms as f64 - jitter_range).max(0.0);
        let max = backoff_ms as f64 + jitter_range;
        rand::rng().random_range(min..=max) as u64
    }
}
