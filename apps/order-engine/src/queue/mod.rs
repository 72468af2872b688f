//! Job Queue
//!
//! In-process queue that runs one [`JobHandler`] attempt per job at a time
//! with:
//! - a worker pool capped at `concurrency` simultaneous attempts
//! - a sliding-window rate limit on attempt starts
//! - retry with exponential backoff for retryable failures
//! - at most one active attempt per order, and at most one unfinished job
//!   per order (enqueueing an order that already has one returns it)
//!
//! Finished jobs are kept for inspection up to each job's retention cap.
//! The queue is not persisted; orders survive restarts through the order
//! store and startup recovery.

mod backoff;
mod job;
mod rate_limiter;

pub use backoff::BackoffPolicy;
pub use job::{Job, JobContext, JobFailure, JobHandler, JobId, JobOptions, JobState, QueueEvent};
pub use rate_limiter::RateLimiter;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::domain::order::OrderId;
use crate::observability::metrics;

// =============================================================================
// Configuration and reports
// =============================================================================

/// Queue-wide settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueConfig {
    /// Maximum simultaneous attempts (default: 10).
    pub concurrency: usize,
    /// Attempt starts allowed per window; 0 disables the limit (default: 100).
    pub rate_limit_max: usize,
    /// Rate limit window (default: 60s).
    pub rate_limit_window: Duration,
    /// Options applied by [`JobQueue::enqueue_default`].
    pub default_job_options: JobOptions,
    /// Buffer size of the lifecycle event channel.
    pub event_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            rate_limit_max: 100,
            rate_limit_window: Duration::from_secs(60),
            default_job_options: JobOptions::default(),
            event_capacity: 1024,
        }
    }
}

/// Queue errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// `shutdown` has been called.
    #[error("job queue is shutting down")]
    ShuttingDown,

    /// Job options are unusable.
    #[error("invalid job options: {0}")]
    InvalidOptions(String),
}

/// Job counts by state. Finished counts cover retained jobs only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Queued or waiting for a retry.
    pub waiting: usize,
    /// Running.
    pub active: usize,
    /// Completed (retained).
    pub completed: usize,
    /// Failed (retained).
    pub failed: usize,
}

/// Result of [`JobQueue::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Every in-flight attempt finished before the timeout.
    pub drained: bool,
    /// Attempts still running when the timeout expired.
    pub abandoned: usize,
}

// =============================================================================
// State
// =============================================================================

#[derive(Debug, Default)]
struct QueueState {
    jobs: HashMap<JobId, Job>,
    /// Jobs ready to run, oldest first.
    ready: VecDeque<JobId>,
    /// Orders with an attempt in flight.
    running_orders: HashSet<OrderId>,
    /// Unfinished job per order.
    open_by_order: HashMap<OrderId, JobId>,
    completed: VecDeque<JobId>,
    failed: VecDeque<JobId>,
}

impl QueueState {
    fn is_runnable(&self, id: &JobId) -> bool {
        self.jobs
            .get(id)
            .is_some_and(|job| !self.running_orders.contains(&job.order_id))
    }

    fn has_runnable(&self) -> bool {
        self.ready.iter().any(|id| self.is_runnable(id))
    }

    fn claim_next(&mut self) -> Option<JobContext> {
        let index = self.ready.iter().position(|id| self.is_runnable(id))?;
        let id = self.ready.remove(index)?;
        let job = self.jobs.get_mut(&id)?;
        job.state = JobState::Active;
        self.running_orders.insert(job.order_id);
        Some(job.context())
    }

    fn retire(&mut self, id: JobId, retention_cap: usize, failed: bool) {
        let history = if failed {
            &mut self.failed
        } else {
            &mut self.completed
        };
        history.push_back(id);
        while history.len() > retention_cap {
            if let Some(evicted) = history.pop_front() {
                self.jobs.remove(&evicted);
            }
        }
    }
}

struct Inner {
    config: QueueConfig,
    handler: Arc<dyn JobHandler>,
    state: Mutex<QueueState>,
    wakeup: Notify,
    workers: Arc<Semaphore>,
    limiter: RateLimiter,
    events: broadcast::Sender<QueueEvent>,
    accepting: AtomicBool,
    shutdown: CancellationToken,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    fn emit(&self, event: QueueEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    async fn wait_for_runnable(&self) {
        loop {
            let notified = self.wakeup.notified();
            let runnable = self.state.lock().has_runnable();
            if runnable {
                return;
            }
            notified.await;
        }
    }

    fn finish(self: &Arc<Self>, ctx: JobContext, result: Result<(), JobFailure>) {
        let event = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            state.running_orders.remove(&ctx.order_id);

            let Some(job) = state.jobs.get_mut(&ctx.job_id) else {
                return;
            };

            match result {
                Ok(()) => {
                    job.state = JobState::Completed;
                    job.finished_at = Some(Utc::now());
                    let cap = job.options.retention_cap;
                    state.open_by_order.remove(&ctx.order_id);
                    state.retire(ctx.job_id, cap, false);
                    QueueEvent::Completed {
                        job_id: ctx.job_id,
                        order_id: ctx.order_id,
                        attempt: ctx.attempt,
                    }
                }
                Err(failure) if failure.retryable && !ctx.is_final_attempt() => {
                    let delay = job.options.backoff.delay_for(ctx.attempt);
                    job.attempt = ctx.attempt + 1;
                    job.state = JobState::Waiting;
                    self.schedule_retry(ctx.job_id, delay);
                    QueueEvent::Retrying {
                        job_id: ctx.job_id,
                        order_id: ctx.order_id,
                        attempt: ctx.attempt,
                        delay,
                        reason: failure.reason,
                    }
                }
                Err(failure) => {
                    job.state = JobState::Failed;
                    job.finished_at = Some(Utc::now());
                    job.failed_reason = Some(failure.reason.clone());
                    let cap = job.options.retention_cap;
                    state.open_by_order.remove(&ctx.order_id);
                    state.retire(ctx.job_id, cap, true);
                    QueueEvent::Failed {
                        job_id: ctx.job_id,
                        order_id: ctx.order_id,
                        attempts: ctx.attempt,
                        reason: failure.reason,
                    }
                }
            }
        };

        match &event {
            QueueEvent::Completed { attempt, .. } => {
                info!(job_id = %ctx.job_id, order_id = %ctx.order_id, attempt, "Job completed");
                metrics::record_job_outcome("completed");
            }
            QueueEvent::Retrying { delay, reason, .. } => {
                warn!(
                    job_id = %ctx.job_id,
                    order_id = %ctx.order_id,
                    attempt = ctx.attempt,
                    delay_ms = delay.as_millis() as u64,
                    reason = %reason,
                    "Job attempt failed, retrying"
                );
                metrics::record_job_outcome("retried");
            }
            QueueEvent::Failed {
                attempts, reason, ..
            } => {
                error!(job_id = %ctx.job_id, order_id = %ctx.order_id, attempts, reason = %reason, "Job failed");
                metrics::record_job_outcome("failed");
            }
            QueueEvent::Started { .. } => {}
        }

        self.emit(event);
        // Another job for the same order may be runnable now.
        self.wakeup.notify_one();
    }

    fn schedule_retry(self: &Arc<Self>, job_id: JobId, delay: Duration) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                () = inner.shutdown.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    inner.state.lock().ready.push_back(job_id);
                    inner.wakeup.notify_one();
                }
            }
        });
    }
}

// =============================================================================
// Queue
// =============================================================================

/// Handle to a running job queue. Cloning shares the same queue.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl JobQueue {
    /// Create the queue and start its dispatcher. Must be called inside a
    /// Tokio runtime.
    pub fn start(config: QueueConfig, handler: Arc<dyn JobHandler>) -> Self {
        let concurrency = config.concurrency.max(1);
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let inner = Arc::new(Inner {
            config,
            handler,
            state: Mutex::new(QueueState::default()),
            wakeup: Notify::new(),
            workers: Arc::new(Semaphore::new(concurrency)),
            limiter: RateLimiter::new(config.rate_limit_max, config.rate_limit_window),
            events,
            accepting: AtomicBool::new(true),
            shutdown: CancellationToken::new(),
            dispatcher: Mutex::new(None),
        });

        let handle = tokio::spawn(dispatch_loop(Arc::clone(&inner)));
        *inner.dispatcher.lock() = Some(handle);

        info!(
            concurrency,
            rate_limit_max = config.rate_limit_max,
            rate_limit_window_ms = config.rate_limit_window.as_millis() as u64,
            "Job queue started"
        );
        Self { inner }
    }

    /// Enqueue a job for `order_id`.
    ///
    /// If the order already has an unfinished job, that job's ID is
    /// returned and no new job is created.
    pub fn enqueue(&self, order_id: OrderId, options: JobOptions) -> Result<JobId, QueueError> {
        if !self.is_accepting() {
            return Err(QueueError::ShuttingDown);
        }
        if options.attempts == 0 {
            return Err(QueueError::InvalidOptions(
                "attempts must be at least 1".to_string(),
            ));
        }

        let job_id = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            if let Some(&existing) = state.open_by_order.get(&order_id) {
                debug!(%order_id, job_id = %existing, "Order already has an open job");
                return Ok(existing);
            }
            let job = Job::new(order_id, options);
            let id = job.id;
            state.jobs.insert(id, job);
            state.ready.push_back(id);
            state.open_by_order.insert(order_id, id);
            id
        };

        self.inner.wakeup.notify_one();
        metrics::record_job_outcome("enqueued");
        debug!(%order_id, %job_id, attempts = options.attempts, "Job enqueued");
        Ok(job_id)
    }

    /// Enqueue with the queue's default job options.
    pub fn enqueue_default(&self, order_id: OrderId) -> Result<JobId, QueueError> {
        self.enqueue(order_id, self.inner.config.default_job_options)
    }

    /// Snapshot of a job, if it is still retained.
    #[must_use]
    pub fn job(&self, id: &JobId) -> Option<Job> {
        self.inner.state.lock().jobs.get(id).cloned()
    }

    /// Job counts by state.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        let state = self.inner.state.lock();
        let mut stats = QueueStats::default();
        for job in state.jobs.values() {
            match job.state {
                JobState::Waiting => stats.waiting += 1,
                JobState::Active => stats.active += 1,
                JobState::Completed => stats.completed += 1,
                JobState::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Subscribe to lifecycle events from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.inner.events.subscribe()
    }

    /// Whether new jobs are accepted.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.inner.accepting.load(Ordering::SeqCst)
    }

    /// Stop accepting jobs, stop starting attempts and wait up to
    /// `timeout` for in-flight attempts.
    ///
    /// Pending retries are dropped. Attempts still running at the timeout
    /// are abandoned; their orders stay non-terminal in the store and are
    /// picked up by recovery on the next start.
    pub async fn shutdown(&self, timeout: Duration) -> ShutdownReport {
        self.inner.accepting.store(false, Ordering::SeqCst);
        self.inner.shutdown.cancel();

        let dispatcher = self.inner.dispatcher.lock().take();
        if let Some(handle) = dispatcher {
            if let Err(e) = handle.await {
                warn!(error = %e, "Job dispatcher ended abnormally");
            }
        }

        let all_workers = u32::try_from(self.inner.config.concurrency.max(1)).unwrap_or(u32::MAX);
        let drained = matches!(
            tokio::time::timeout(timeout, self.inner.workers.acquire_many(all_workers)).await,
            Ok(Ok(_))
        );

        let abandoned = if drained { 0 } else { self.stats().active };
        if drained {
            info!("Job queue drained");
        } else {
            warn!(abandoned, "Job queue shutdown timed out with attempts in flight");
        }
        ShutdownReport { drained, abandoned }
    }
}

async fn dispatch_loop(inner: Arc<Inner>) {
    loop {
        let permit = tokio::select! {
            () = inner.shutdown.cancelled() => break,
            permit = Arc::clone(&inner.workers).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        tokio::select! {
            () = inner.shutdown.cancelled() => break,
            () = inner.wait_for_runnable() => {}
        }

        tokio::select! {
            () = inner.shutdown.cancelled() => break,
            () = inner.limiter.acquire() => {}
        }

        let claimed = { inner.state.lock().claim_next() };
        let Some(ctx) = claimed else {
            continue;
        };

        debug!(job_id = %ctx.job_id, order_id = %ctx.order_id, attempt = ctx.attempt, "Job attempt starting");
        inner.emit(QueueEvent::Started {
            job_id: ctx.job_id,
            order_id: ctx.order_id,
            attempt: ctx.attempt,
        });
        tokio::spawn(run_attempt(Arc::clone(&inner), ctx, permit));
    }
    debug!("Job dispatcher stopped");
}

async fn run_attempt(inner: Arc<Inner>, ctx: JobContext, _permit: OwnedSemaphorePermit) {
    let started = Instant::now();
    let handler = Arc::clone(&inner.handler);
    let span = info_span!(
        "job",
        job_id = %ctx.job_id,
        order_id = %ctx.order_id,
        attempt = ctx.attempt
    );

    let result = match tokio::spawn(async move { handler.handle(ctx).await }.instrument(span)).await
    {
        Ok(result) => result,
        Err(e) => Err(JobFailure::retryable(format!("job handler aborted: {e}"))),
    };

    metrics::record_job_duration(started.elapsed());
    inner.finish(ctx, result);
}
