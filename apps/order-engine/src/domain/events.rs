//! Order lifecycle events.
//!
//! One event per status transition. The wire form is a flat JSON object
//! tagged by `status`, e.g.
//! `{"status":"building","orderId":"...","dex":"Meteora"}`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::OrderError;
use super::order::{Order, OrderId, OrderStatus};
use super::venue::Venue;

/// Event pushed to subscribers of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum OrderEvent {
    /// Order accepted.
    Pending {
        /// Order identifier.
        order_id: OrderId,
    },
    /// Quotes are being collected.
    Routing {
        /// Order identifier.
        order_id: OrderId,
    },
    /// Best venue chosen.
    Building {
        /// Order identifier.
        order_id: OrderId,
        /// Chosen venue.
        dex: Venue,
    },
    /// Swap sent to the venue.
    Submitted {
        /// Order identifier.
        order_id: OrderId,
        /// Venue executing the swap.
        dex: Venue,
    },
    /// Swap executed.
    Confirmed {
        /// Order identifier.
        order_id: OrderId,
        /// Venue that executed the swap.
        dex: Venue,
        /// Transaction hash.
        tx_hash: String,
        /// Realised price.
        executed_price: Decimal,
    },
    /// Order failed.
    Failed {
        /// Order identifier.
        order_id: OrderId,
        /// Failure reason.
        error: String,
    },
}

impl OrderEvent {
    /// Build the event describing the order's current status.
    ///
    /// # Errors
    ///
    /// Returns an error when the order lacks a field its status requires,
    /// such as a venue for `building`.
    pub fn from_order(order: &Order) -> Result<Self, OrderError> {
        let order_id = order.id();
        let venue = || order.chosen_venue().ok_or(OrderError::MissingVenue(order_id));

        Ok(match order.status() {
            OrderStatus::Pending => Self::Pending { order_id },
            OrderStatus::Routing => Self::Routing { order_id },
            OrderStatus::Building => Self::Building {
                order_id,
                dex: venue()?,
            },
            OrderStatus::Submitted => Self::Submitted {
                order_id,
                dex: venue()?,
            },
            OrderStatus::Confirmed => Self::Confirmed {
                order_id,
                dex: venue()?,
                tx_hash: order.transaction_hash().unwrap_or_default().to_string(),
                executed_price: order.executed_price().unwrap_or_default(),
            },
            OrderStatus::Failed => Self::Failed {
                order_id,
                error: order.failure_reason().unwrap_or("unknown error").to_string(),
            },
        })
    }

    /// Order the event belongs to.
    #[must_use]
    pub const fn order_id(&self) -> OrderId {
        match self {
            Self::Pending { order_id }
            | Self::Routing { order_id }
            | Self::Building { order_id, .. }
            | Self::Submitted { order_id, .. }
            | Self::Confirmed { order_id, .. }
            | Self::Failed { order_id, .. } => *order_id,
        }
    }

    /// Status the event announces.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        match self {
            Self::Pending { .. } => OrderStatus::Pending,
            Self::Routing { .. } => OrderStatus::Routing,
            Self::Building { .. } => OrderStatus::Building,
            Self::Submitted { .. } => OrderStatus::Submitted,
            Self::Confirmed { .. } => OrderStatus::Confirmed,
            Self::Failed { .. } => OrderStatus::Failed,
        }
    }

    /// JSON wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::NewOrder;
    use crate::domain::venue::SwapReceipt;
    use rust_decimal_macros::dec;

    fn order() -> Order {
        Order::new(NewOrder {
            token_in: "SOL".to_string(),
            token_out: "USDC".to_string(),
            amount_in: dec!(1),
            limit_price: dec!(1),
        })
        .unwrap()
    }

    #[test]
    fn wire_form_is_flat_and_tagged() {
        let id = OrderId::generate();
        let event = OrderEvent::Confirmed {
            order_id: id,
            dex: Venue::Raydium,
            tx_hash: "0xfeed".to_string(),
            executed_price: dec!(1.25),
        };
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();

        assert_eq!(json["status"], "confirmed");
        assert_eq!(json["orderId"], id.to_string());
        assert_eq!(json["dex"], "Raydium");
        assert_eq!(json["txHash"], "0xfeed");
        assert_eq!(json["executedPrice"], "1.25");
    }

    #[test]
    fn failed_event_carries_error() {
        let id = OrderId::generate();
        let json = serde_json::to_value(OrderEvent::Failed {
            order_id: id,
            error: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
    }

    #[test]
    fn from_order_follows_lifecycle() {
        let mut order = order();
        assert_eq!(
            OrderEvent::from_order(&order).unwrap(),
            OrderEvent::Pending { order_id: order.id() }
        );

        order.start_routing().unwrap();
        order.start_building(Venue::Meteora).unwrap();
        assert_eq!(
            OrderEvent::from_order(&order).unwrap(),
            OrderEvent::Building {
                order_id: order.id(),
                dex: Venue::Meteora
            }
        );

        order.mark_submitted().unwrap();
        order
            .confirm(&SwapReceipt {
                venue: Venue::Meteora,
                tx_hash: "0x1".to_string(),
                executed_price: dec!(3),
            })
            .unwrap();
        let event = OrderEvent::from_order(&order).unwrap();
        assert_eq!(event.status(), OrderStatus::Confirmed);
        assert_eq!(event.order_id(), order.id());
    }
}
