//! Execute Order Use Case
//!
//! Drives one order from its persisted status to `confirmed` or `failed`:
//!
//! 1. `pending -> routing`
//! 2. quote every venue, pick the best, enforce the limit price
//! 3. `routing -> building` with the chosen venue
//! 4. `building -> submitted`
//! 5. execute the swap, `submitted -> confirmed`
//!
//! Each transition is saved to the store before the matching event is
//! published. A run resumes from whatever status the store holds, so a
//! retry after a transient failure does not repeat finished steps. An
//! order found at `submitted` is first checked with the venue so a swap
//! that already landed is not executed twice.
//!
//! A failure marks the order `failed` when it is permanent or when the
//! queue says this was the last attempt; otherwise the status is left as
//! is for the retry. A panic inside a run is caught at the job boundary
//! and fails the order like any other permanent error.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::application::ports::{OrderStore, StoreError, VenueAdapter, VenueError};
use crate::application::services::{NotificationHub, RoutingError, VenueRouter};
use crate::domain::errors::OrderError;
use crate::domain::events::OrderEvent;
use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::domain::venue::{SwapReceipt, SwapRequest};
use crate::observability::metrics;
use crate::queue::{JobContext, JobFailure, JobHandler};

/// Execution errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutionError {
    /// No such order in the store.
    #[error("order {0} not found")]
    NotFound(OrderId),

    /// Best quote is below the order's limit price.
    #[error("best price {best} below limit {limit}")]
    LimitNotMet {
        /// Best quoted price.
        best: Decimal,
        /// Order limit price.
        limit: Decimal,
    },

    /// No venues are enabled.
    #[error("no venues enabled")]
    NoVenues,

    /// Venue call failed.
    #[error(transparent)]
    Venue(#[from] VenueError),

    /// Store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Order lifecycle violation.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// The run panicked.
    #[error("execution aborted: {0}")]
    Aborted(String),
}

impl ExecutionError {
    /// Whether another attempt may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Venue(e) => e.is_retryable(),
            Self::Store(_) => true,
            Self::NotFound(_)
            | Self::LimitNotMet { .. }
            | Self::NoVenues
            | Self::Order(_)
            | Self::Aborted(_) => false,
        }
    }
}

impl From<RoutingError> for ExecutionError {
    fn from(err: RoutingError) -> Self {
        match err {
            RoutingError::Venue(e) => Self::Venue(e),
            RoutingError::LimitNotMet { best, limit } => Self::LimitNotMet {
                best: best.price,
                limit,
            },
            RoutingError::NoVenues => Self::NoVenues,
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The swap executed and the order is confirmed.
    Confirmed(SwapReceipt),
    /// The order was already terminal; nothing was done.
    AlreadyFinished(OrderStatus),
}

/// Runs orders through the lifecycle. Used as the job queue's handler.
pub struct OrderExecutor<S, V>
where
    S: OrderStore,
    V: VenueAdapter,
{
    store: Arc<S>,
    router: VenueRouter<V>,
    hub: Arc<NotificationHub>,
}

impl<S, V> OrderExecutor<S, V>
where
    S: OrderStore,
    V: VenueAdapter,
{
    /// Create a new executor.
    pub const fn new(store: Arc<S>, router: VenueRouter<V>, hub: Arc<NotificationHub>) -> Self {
        Self { store, router, hub }
    }

    /// Execute `order_id` from its persisted status.
    ///
    /// `final_attempt` tells the executor that a retryable failure will not
    /// be retried, so the order must be marked failed.
    pub async fn execute(
        &self,
        order_id: OrderId,
        final_attempt: bool,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let mut order = self
            .store
            .find_by_id(&order_id)
            .await?
            .ok_or(ExecutionError::NotFound(order_id))?;

        if order.status().is_terminal() {
            debug!(%order_id, status = %order.status(), "Order already finished");
            return Ok(ExecutionOutcome::AlreadyFinished(order.status()));
        }

        let resumed_at_submission = order.status() == OrderStatus::Submitted;
        match self.drive(&mut order, resumed_at_submission).await {
            Ok(receipt) => Ok(ExecutionOutcome::Confirmed(receipt)),
            Err(err) => {
                if !err.is_retryable() || final_attempt {
                    self.mark_failed(&mut order, &err).await;
                } else {
                    warn!(%order_id, status = %order.status(), error = %err, "Execution failed, will retry");
                }
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        order: &mut Order,
        resumed_at_submission: bool,
    ) -> Result<SwapReceipt, ExecutionError> {
        loop {
            match order.status() {
                OrderStatus::Pending => {
                    order.start_routing()?;
                    self.commit(order).await?;
                }
                OrderStatus::Routing => {
                    let decision = self
                        .router
                        .route(&order.trading_pair(), order.amount_in(), order.limit_price())
                        .await?;
                    order.start_building(decision.best.venue)?;
                    self.commit(order).await?;
                }
                OrderStatus::Building => {
                    order.mark_submitted()?;
                    self.commit(order).await?;
                }
                OrderStatus::Submitted => {
                    let receipt = self.submit_swap(order, resumed_at_submission).await?;
                    order.confirm(&receipt)?;
                    self.commit(order).await?;
                    return Ok(receipt);
                }
                status @ (OrderStatus::Confirmed | OrderStatus::Failed) => {
                    return Err(OrderError::Terminal {
                        order_id: order.id(),
                        status,
                    }
                    .into());
                }
            }
        }
    }

    async fn submit_swap(
        &self,
        order: &Order,
        resumed_at_submission: bool,
    ) -> Result<SwapReceipt, ExecutionError> {
        let order_id = order.id();
        let venue = order
            .chosen_venue()
            .ok_or(OrderError::MissingVenue(order_id))?;

        if resumed_at_submission {
            if let Some(receipt) = self.router.find_swap(venue, &order_id).await? {
                info!(%order_id, %venue, tx_hash = %receipt.tx_hash, "Swap already executed, reusing receipt");
                return Ok(receipt);
            }
        }

        let request = SwapRequest {
            order_id,
            pair: order.trading_pair(),
            amount_in: order.amount_in(),
            min_acceptable_price: order.limit_price(),
        };
        let receipt = self.router.execute_swap(venue, &request).await?;
        info!(
            %order_id,
            %venue,
            tx_hash = %receipt.tx_hash,
            executed_price = %receipt.executed_price,
            "Swap executed"
        );
        Ok(receipt)
    }

    /// Save, then publish.
    async fn commit(&self, order: &Order) -> Result<(), ExecutionError> {
        self.store.save(order).await?;
        let event = OrderEvent::from_order(order)?;
        let delivered = self.hub.publish(order.id(), &event);
        metrics::record_order_transition(order.status());
        info!(
            order_id = %order.id(),
            status = %order.status(),
            subscribers = delivered,
            "Order status changed"
        );
        Ok(())
    }

    async fn mark_failed(&self, order: &mut Order, err: &ExecutionError) {
        let order_id = order.id();
        match self.store.find_by_id(&order_id).await {
            Ok(Some(current)) if current.status().is_terminal() => {
                debug!(%order_id, status = %current.status(), "Order already terminal, not failing it");
                return;
            }
            Ok(_) => {}
            Err(e) => warn!(%order_id, error = %e, "Could not re-read order before failing it"),
        }

        if let Err(e) = order.fail(err.to_string()) {
            debug!(%order_id, error = %e, "Order not marked failed");
            return;
        }
        if let Err(e) = self.commit(order).await {
            error!(%order_id, error = %e, "Failed to record order failure");
        }
    }

    /// Fail `order_id` after its run panicked.
    async fn abort(&self, order_id: OrderId, message: String) -> ExecutionError {
        let err = ExecutionError::Aborted(message);
        error!(%order_id, error = %err, "Order execution panicked");
        match self.store.find_by_id(&order_id).await {
            Ok(Some(mut order)) => self.mark_failed(&mut order, &err).await,
            Ok(None) => {}
            Err(e) => error!(%order_id, error = %e, "Could not load order after panic"),
        }
        err
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[async_trait]
impl<S, V> JobHandler for OrderExecutor<S, V>
where
    S: OrderStore + 'static,
    V: VenueAdapter + 'static,
{
    async fn handle(&self, ctx: JobContext) -> Result<(), JobFailure> {
        let run = AssertUnwindSafe(self.execute(ctx.order_id, ctx.is_final_attempt()));
        let result = match run.catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(self.abort(ctx.order_id, panic_message(&*payload)).await),
        };
        match result {
            Ok(_) => Ok(()),
            Err(e) => Err(JobFailure {
                reason: e.to_string(),
                retryable: e.is_retryable(),
            }),
        }
    }
}
