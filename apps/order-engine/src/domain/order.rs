//! Order Aggregate
//!
//! The order and its status lifecycle:
//!
//! ```text
//! pending -> routing -> building -> submitted -> confirmed
//!    \          \           \           \
//!     +----------+-----------+-----------+--> failed
//! ```
//!
//! `confirmed` and `failed` are terminal. Every mutation goes through
//! [`Order::transition`] so an invalid or post-terminal change is rejected
//! instead of silently overwriting state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::OrderError;
use super::venue::{SwapReceipt, TradingPair, Venue};

// ============================================================================
// Identifiers
// ============================================================================

/// Unique order identifier (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Generate a new random order ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for OrderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

// ============================================================================
// Status
// ============================================================================

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Accepted and persisted, waiting for a worker.
    Pending,
    /// Collecting quotes from venues.
    Routing,
    /// Best venue chosen, preparing the swap.
    Building,
    /// Swap sent to the venue.
    Submitted,
    /// Swap executed (terminal).
    Confirmed,
    /// Order failed (terminal).
    Failed,
}

impl OrderStatus {
    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }

    /// Whether `self -> target` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        match (self, target) {
            (Self::Pending, Self::Routing)
            | (Self::Routing, Self::Building)
            | (Self::Building, Self::Submitted)
            | (Self::Submitted, Self::Confirmed) => true,
            (from, Self::Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Routing => "routing",
            Self::Building => "building",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order type. Only limit orders are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Execute only at or above the limit price.
    #[default]
    Limit,
}

// ============================================================================
// Aggregate
// ============================================================================

/// Validated fields for a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    /// Token sold.
    pub token_in: String,
    /// Token bought.
    pub token_out: String,
    /// Amount of `token_in` to sell.
    pub amount_in: Decimal,
    /// Minimum acceptable price (`token_out` per `token_in`).
    pub limit_price: Decimal,
}

/// A limit order and its execution state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    token_in: String,
    token_out: String,
    amount_in: Decimal,
    limit_price: Decimal,
    order_type: OrderType,
    status: OrderStatus,
    chosen_venue: Option<Venue>,
    transaction_hash: Option<String>,
    executed_price: Option<Decimal>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Create a pending order with a fresh ID.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Invalid` if a token is blank or an amount is not
    /// strictly positive.
    pub fn new(fields: NewOrder) -> Result<Self, OrderError> {
        let NewOrder {
            token_in,
            token_out,
            amount_in,
            limit_price,
        } = fields;

        if token_in.trim().is_empty() {
            return Err(OrderError::Invalid("tokenIn must not be empty".to_string()));
        }
        if token_out.trim().is_empty() {
            return Err(OrderError::Invalid("tokenOut must not be empty".to_string()));
        }
        if amount_in <= Decimal::ZERO {
            return Err(OrderError::Invalid("amountIn must be positive".to_string()));
        }
        if limit_price <= Decimal::ZERO {
            return Err(OrderError::Invalid("limitPrice must be positive".to_string()));
        }

        let now = Utc::now();
        Ok(Self {
            id: OrderId::generate(),
            token_in,
            token_out,
            amount_in,
            limit_price,
            order_type: OrderType::Limit,
            status: OrderStatus::Pending,
            chosen_venue: None,
            transaction_hash: None,
            executed_price: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Order ID.
    #[must_use]
    pub const fn id(&self) -> OrderId {
        self.id
    }

    /// Token sold.
    #[must_use]
    pub fn token_in(&self) -> &str {
        &self.token_in
    }

    /// Token bought.
    #[must_use]
    pub fn token_out(&self) -> &str {
        &self.token_out
    }

    /// Amount of `token_in` to sell.
    #[must_use]
    pub const fn amount_in(&self) -> Decimal {
        self.amount_in
    }

    /// Minimum acceptable price.
    #[must_use]
    pub const fn limit_price(&self) -> Decimal {
        self.limit_price
    }

    /// Order type.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Venue chosen during routing.
    #[must_use]
    pub const fn chosen_venue(&self) -> Option<Venue> {
        self.chosen_venue
    }

    /// Transaction hash, once confirmed.
    #[must_use]
    pub fn transaction_hash(&self) -> Option<&str> {
        self.transaction_hash.as_deref()
    }

    /// Executed price, once confirmed.
    #[must_use]
    pub const fn executed_price(&self) -> Option<Decimal> {
        self.executed_price
    }

    /// Failure reason, once failed.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Creation time.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time of the last mutation.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// The pair being swapped.
    #[must_use]
    pub fn trading_pair(&self) -> TradingPair {
        TradingPair::new(self.token_in.clone(), self.token_out.clone())
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// `pending -> routing`.
    pub fn start_routing(&mut self) -> Result<(), OrderError> {
        self.transition(OrderStatus::Routing)
    }

    /// `routing -> building`, recording the venue that won routing.
    pub fn start_building(&mut self, venue: Venue) -> Result<(), OrderError> {
        self.transition(OrderStatus::Building)?;
        self.chosen_venue = Some(venue);
        Ok(())
    }

    /// `building -> submitted`.
    pub fn mark_submitted(&mut self) -> Result<(), OrderError> {
        if self.chosen_venue.is_none() {
            return Err(OrderError::MissingVenue(self.id));
        }
        self.transition(OrderStatus::Submitted)
    }

    /// `submitted -> confirmed`, recording the execution result.
    pub fn confirm(&mut self, receipt: &SwapReceipt) -> Result<(), OrderError> {
        self.transition(OrderStatus::Confirmed)?;
        self.chosen_venue = Some(receipt.venue);
        self.transaction_hash = Some(receipt.tx_hash.clone());
        self.executed_price = Some(receipt.executed_price);
        Ok(())
    }

    /// Any non-terminal status `-> failed`.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), OrderError> {
        self.transition(OrderStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    fn transition(&mut self, target: OrderStatus) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::Terminal {
                order_id: self.id,
                status: self.status,
            });
        }
        if !self.status.can_transition_to(target) {
            return Err(OrderError::InvalidTransition {
                order_id: self.id,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        self.updated_at = Utc::now();
        Ok(())
    }
}
