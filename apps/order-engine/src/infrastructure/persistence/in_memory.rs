//! In-memory order store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::application::ports::{OrderStore, StoreError};
use crate::domain::order::{Order, OrderId};

/// In-memory implementation of `OrderStore`.
///
/// Suitable for testing and development. Orders are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.read().is_empty()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn save(&self, order: &Order) -> Result<(), StoreError> {
        self.orders.write().insert(order.id(), order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.read().get(id).cloned())
    }

    async fn find_active(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .orders
            .read()
            .values()
            .filter(|o| !o.status().is_terminal())
            .cloned()
            .collect())
    }
}
