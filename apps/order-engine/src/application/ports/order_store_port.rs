//! Order Store Port (Driven Port)
//!
//! Durable storage of orders. The executor persists every status change
//! here before announcing it, and recovery reads non-terminal orders back
//! at startup.

use async_trait::async_trait;

use crate::domain::order::{Order, OrderId};

/// Order store errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Backend not reachable or not responding.
    #[error("Order store unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// Stored record could not be encoded or decoded.
    #[error("Order store serialization error: {message}")]
    Serialization {
        /// Error details.
        message: String,
    },
}

/// Port for persisting orders.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert or replace an order.
    async fn save(&self, order: &Order) -> Result<(), StoreError>;

    /// Look up an order by ID.
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// All orders that are not yet `confirmed` or `failed`.
    async fn find_active(&self) -> Result<Vec<Order>, StoreError>;
}
