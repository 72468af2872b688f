//! Job queue configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::queue::{BackoffPolicy, JobOptions, QueueConfig};

/// Job queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Maximum simultaneous order executions.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Attempts per order, including the first.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Delay before the first retry; doubles per attempt.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Retry delay ceiling.
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    /// Random spread applied to retry delays (0.0 - 1.0).
    #[serde(default)]
    pub jitter: f64,
    /// Finished jobs kept per outcome.
    #[serde(default = "default_retention_cap")]
    pub retention_cap: usize,
    /// Attempt starts allowed per window; 0 disables the limit.
    #[serde(default = "default_rate_limit_max")]
    pub rate_limit_max: usize,
    /// Rate limit window.
    #[serde(default = "default_rate_limit_window_ms")]
    pub rate_limit_window_ms: u64,
    /// Time allowed for in-flight jobs on shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            attempts: default_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            jitter: 0.0,
            retention_cap: default_retention_cap(),
            rate_limit_max: default_rate_limit_max(),
            rate_limit_window_ms: default_rate_limit_window_ms(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl QueueSettings {
    /// Options applied to every submitted order.
    #[must_use]
    pub const fn job_options(&self) -> JobOptions {
        JobOptions {
            attempts: self.attempts,
            backoff: BackoffPolicy::exponential(Duration::from_millis(self.backoff_base_ms))
                .with_max_backoff(Duration::from_millis(self.backoff_max_ms))
                .with_jitter(self.jitter),
            retention_cap: self.retention_cap,
        }
    }

    /// Convert to the queue's runtime configuration.
    #[must_use]
    pub fn to_queue_config(&self) -> QueueConfig {
        QueueConfig {
            concurrency: self.concurrency,
            rate_limit_max: self.rate_limit_max,
            rate_limit_window: Duration::from_millis(self.rate_limit_window_ms),
            default_job_options: self.job_options(),
            ..QueueConfig::default()
        }
    }

    /// Shutdown drain timeout.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

const fn default_concurrency() -> usize {
    10
}

const fn default_attempts() -> u32 {
    3
}

const fn default_backoff_base_ms() -> u64 {
    1000
}

const fn default_backoff_max_ms() -> u64 {
    300_000
}

const fn default_retention_cap() -> usize {
    100
}

const fn default_rate_limit_max() -> usize {
    100
}

const fn default_rate_limit_window_ms() -> u64 {
    60_000
}

const fn default_shutdown_timeout_secs() -> u64 {
    30
}
