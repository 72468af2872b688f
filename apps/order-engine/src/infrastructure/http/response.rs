//! HTTP response DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::order::OrderId;

/// Response to a successful order submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderResponse {
    /// ID to subscribe with.
    pub order_id: OrderId,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// First frame on an accepted WebSocket subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribedMessage {
    /// Always `true`.
    pub ok: bool,
    /// Subscribed order.
    pub order_id: OrderId,
    /// Human-readable acknowledgement.
    pub message: String,
}

impl SubscribedMessage {
    /// Acknowledgement for `order_id`.
    #[must_use]
    pub fn new(order_id: OrderId) -> Self {
        Self {
            ok: true,
            order_id,
            message: "Subscribed".to_string(),
        }
    }
}

/// Error frame sent before a rejected WebSocket is closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketErrorMessage {
    /// Reason for the rejection.
    pub error: String,
}
