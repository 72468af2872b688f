//! Recover Orders Use Case
//!
//! Re-queues every non-terminal order found in the store. Run once at
//! startup so orders interrupted by a restart finish; the executor resumes
//! each from its persisted status.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::ports::{OrderStore, StoreError};
use crate::queue::JobQueue;

/// Summary of a recovery pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Non-terminal orders found.
    pub found: usize,
    /// Orders queued.
    pub enqueued: usize,
    /// Orders the queue refused.
    pub skipped: usize,
}

/// Use case for re-queuing unfinished orders.
pub struct RecoverOrdersUseCase<S>
where
    S: OrderStore,
{
    store: Arc<S>,
    queue: JobQueue,
}

impl<S> RecoverOrdersUseCase<S>
where
    S: OrderStore,
{
    /// Create a new RecoverOrdersUseCase.
    pub const fn new(store: Arc<S>, queue: JobQueue) -> Self {
        Self { store, queue }
    }

    /// Execute the use case.
    pub async fn execute(&self) -> Result<RecoveryReport, StoreError> {
        let mut orders = self.store.find_active().await?;
        orders.sort_by_key(|order| order.created_at());

        let mut report = RecoveryReport {
            found: orders.len(),
            ..RecoveryReport::default()
        };

        for order in &orders {
            match self.queue.enqueue_default(order.id()) {
                Ok(_) => report.enqueued += 1,
                Err(e) => {
                    warn!(order_id = %order.id(), status = %order.status(), error = %e, "Could not re-queue order");
                    report.skipped += 1;
                }
            }
        }

        info!(
            found = report.found,
            enqueued = report.enqueued,
            skipped = report.skipped,
            "Order recovery complete"
        );
        Ok(report)
    }
}
