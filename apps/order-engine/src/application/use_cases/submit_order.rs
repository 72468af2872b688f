//! Submit Order Use Case
//!
//! Accepts a validated order: persist it as `pending`, announce it, and
//! hand it to the job queue. The caller gets the order back as soon as it
//! is queued; execution happens on a worker.

use std::sync::Arc;

use tracing::{error, info};

use crate::application::ports::{OrderStore, StoreError};
use crate::application::services::NotificationHub;
use crate::domain::errors::OrderError;
use crate::domain::events::OrderEvent;
use crate::domain::order::{NewOrder, Order};
use crate::observability::metrics;
use crate::queue::{JobQueue, QueueError};

/// Submission errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SubmitOrderError {
    /// Order fields are invalid.
    #[error(transparent)]
    Invalid(#[from] OrderError),

    /// Order could not be saved.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Order was saved but could not be queued.
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Use case for accepting new orders.
pub struct SubmitOrderUseCase<S>
where
    S: OrderStore,
{
    store: Arc<S>,
    queue: JobQueue,
    hub: Arc<NotificationHub>,
}

impl<S> SubmitOrderUseCase<S>
where
    S: OrderStore,
{
    /// Create a new SubmitOrderUseCase.
    pub const fn new(store: Arc<S>, queue: JobQueue, hub: Arc<NotificationHub>) -> Self {
        Self { store, queue, hub }
    }

    /// Execute the use case.
    pub async fn execute(&self, fields: NewOrder) -> Result<Order, SubmitOrderError> {
        let order = Order::new(fields)?;
        let order_id = order.id();

        self.store.save(&order).await?;
        self.hub.publish(order_id, &OrderEvent::Pending { order_id });

        if let Err(e) = self.queue.enqueue_default(order_id) {
            // Still pending in the store; recovery re-queues it on restart.
            error!(%order_id, error = %e, "Order saved but not queued");
            return Err(e.into());
        }

        metrics::record_order_submitted();
        info!(
            %order_id,
            pair = %order.trading_pair(),
            amount_in = %order.amount_in(),
            limit_price = %order.limit_price(),
            "Order accepted"
        );
        Ok(order)
    }
}
