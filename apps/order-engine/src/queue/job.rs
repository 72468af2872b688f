//! Job records, handler contract and lifecycle events.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::backoff::BackoffPolicy;
use crate::domain::order::OrderId;

// =============================================================================
// Identifiers and state
// =============================================================================

/// Unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Where a job is in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Queued, or sleeping before a retry.
    Waiting,
    /// A worker is running the handler.
    Active,
    /// Handler succeeded.
    Completed,
    /// Attempts exhausted or a non-retryable failure.
    Failed,
}

/// Per-job options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobOptions {
    /// Total attempts including the first (default: 3).
    pub attempts: u32,
    /// Delay schedule between attempts.
    pub backoff: BackoffPolicy,
    /// How many finished jobs of each outcome to keep for inspection
    /// (default: 100).
    pub retention_cap: usize,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: BackoffPolicy::exponential(Duration::from_millis(1000)),
            retention_cap: 100,
        }
    }
}

/// Snapshot of a job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Job ID.
    pub id: JobId,
    /// Order the job executes.
    pub order_id: OrderId,
    /// Current (or last) attempt, 1-based.
    pub attempt: u32,
    /// Attempt limit.
    pub max_attempts: u32,
    /// Current state.
    pub state: JobState,
    /// Reason of the final failure.
    pub failed_reason: Option<String>,
    /// When the job was enqueued.
    pub enqueued_at: DateTime<Utc>,
    /// When the job finished.
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub(crate) options: JobOptions,
}

impl Job {
    pub(crate) fn new(order_id: OrderId, options: JobOptions) -> Self {
        Self {
            id: JobId::generate(),
            order_id,
            attempt: 1,
            max_attempts: options.attempts,
            state: JobState::Waiting,
            failed_reason: None,
            enqueued_at: Utc::now(),
            finished_at: None,
            options,
        }
    }

    pub(crate) fn context(&self) -> JobContext {
        JobContext {
            job_id: self.id,
            order_id: self.order_id,
            attempt: self.attempt,
            max_attempts: self.max_attempts,
        }
    }
}

// =============================================================================
// Handler contract
// =============================================================================

/// What a handler is told about the attempt it is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobContext {
    /// Job ID.
    pub job_id: JobId,
    /// Order to execute.
    pub order_id: OrderId,
    /// This attempt, 1-based.
    pub attempt: u32,
    /// Attempt limit.
    pub max_attempts: u32,
}

impl JobContext {
    /// Whether a failure of this attempt is final.
    #[must_use]
    pub const fn is_final_attempt(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// Failure reported by a handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct JobFailure {
    /// Human-readable reason.
    pub reason: String,
    /// Whether another attempt may succeed.
    pub retryable: bool,
}

impl JobFailure {
    /// Transient failure; the queue retries while attempts remain.
    pub fn retryable(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            retryable: true,
        }
    }

    /// Permanent failure; the job fails immediately.
    pub fn permanent(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            retryable: false,
        }
    }
}

/// Work run by queue workers for each job attempt.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Run one attempt.
    async fn handle(&self, ctx: JobContext) -> Result<(), JobFailure>;
}

// =============================================================================
// Lifecycle events
// =============================================================================

/// Queue lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// An attempt started.
    Started {
        /// Job ID.
        job_id: JobId,
        /// Order ID.
        order_id: OrderId,
        /// Attempt number.
        attempt: u32,
    },
    /// The job succeeded.
    Completed {
        /// Job ID.
        job_id: JobId,
        /// Order ID.
        order_id: OrderId,
        /// Attempt that succeeded.
        attempt: u32,
    },
    /// An attempt failed and another is scheduled.
    Retrying {
        /// Job ID.
        job_id: JobId,
        /// Order ID.
        order_id: OrderId,
        /// Attempt that failed.
        attempt: u32,
        /// Wait before the next attempt.
        delay: Duration,
        /// Failure reason.
        reason: String,
    },
    /// The job failed for good.
    Failed {
        /// Job ID.
        job_id: JobId,
        /// Order ID.
        order_id: OrderId,
        /// Attempts made.
        attempts: u32,
        /// Failure reason.
        reason: String,
    },
}

impl QueueEvent {
    /// Job the event is about.
    #[must_use]
    pub const fn job_id(&self) -> JobId {
        match self {
            Self::Started { job_id, .. }
            | Self::Completed { job_id, .. }
            | Self::Retrying { job_id, .. }
            | Self::Failed { job_id, .. } => *job_id,
        }
    }

    /// Whether the job finished with this event.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_starts_waiting_at_attempt_one() {
        let job = Job::new(OrderId::generate(), JobOptions::default());
        assert_eq!(job.state, JobState::Waiting);
        assert_eq!(job.attempt, 1);
        assert_eq!(job.max_attempts, 3);

        let ctx = job.context();
        assert!(!ctx.is_final_attempt());
    }

    #[test]
    fn final_attempt_detection() {
        let ctx = JobContext {
            job_id: JobId::generate(),
            order_id: OrderId::generate(),
            attempt: 3,
            max_attempts: 3,
        };
        assert!(ctx.is_final_attempt());
    }

    #[test]
    fn failure_constructors() {
        assert!(JobFailure::retryable("timeout").retryable);
        let permanent = JobFailure::permanent("rejected");
        assert!(!permanent.retryable);
        assert_eq!(permanent.to_string(), "rejected");
    }
}
