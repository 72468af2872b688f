//! Domain errors for the order aggregate.

use thiserror::Error;

use super::order::{OrderId, OrderStatus};

/// Errors raised by `Order` invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Order fields failed validation at creation.
    #[error("invalid order: {0}")]
    Invalid(String),

    /// The order already reached `confirmed` or `failed`.
    #[error("order {order_id} is already {status}")]
    Terminal {
        /// Order identifier.
        order_id: OrderId,
        /// Terminal status the order is in.
        status: OrderStatus,
    },

    /// Transition not allowed by the lifecycle.
    #[error("invalid transition for order {order_id}: {from} -> {to}")]
    InvalidTransition {
        /// Order identifier.
        order_id: OrderId,
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },

    /// A step that needs the routed venue ran before routing recorded one.
    #[error("order {0} has no chosen venue")]
    MissingVenue(OrderId),
}
