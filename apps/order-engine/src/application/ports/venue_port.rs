//! Venue Port (Driven Port)
//!
//! Interface to a liquidity venue: quoting, executing and looking up swaps.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::order::OrderId;
use crate::domain::venue::{Quote, SwapReceipt, SwapRequest, TradingPair, Venue};

/// Venue errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VenueError {
    /// Venue could not be reached or returned a transient error.
    #[error("{venue} unavailable: {message}")]
    Unavailable {
        /// Venue that failed.
        venue: Venue,
        /// Error details.
        message: String,
    },

    /// Venue call exceeded its deadline.
    #[error("{venue} {operation} timed out")]
    Timeout {
        /// Venue that timed out.
        venue: Venue,
        /// Operation that timed out (`quote`, `swap`, `lookup`).
        operation: &'static str,
    },

    /// Venue refused the request; retrying will not help.
    #[error("{venue} rejected request: {reason}")]
    Rejected {
        /// Venue that rejected.
        venue: Venue,
        /// Rejection reason.
        reason: String,
    },
}

impl VenueError {
    /// Whether the failure is transient and the job should be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }

    /// Venue the error came from.
    #[must_use]
    pub const fn venue(&self) -> Venue {
        match self {
            Self::Unavailable { venue, .. }
            | Self::Timeout { venue, .. }
            | Self::Rejected { venue, .. } => *venue,
        }
    }
}

/// Port for talking to liquidity venues.
///
/// One adapter serves every venue; the venue is passed per call.
#[async_trait]
pub trait VenueAdapter: Send + Sync {
    /// Price for selling `amount_in` of `pair.token_in` on `venue`.
    async fn get_quote(
        &self,
        venue: Venue,
        pair: &TradingPair,
        amount_in: Decimal,
    ) -> Result<Quote, VenueError>;

    /// Execute a swap on `venue`. Must not fill below
    /// `request.min_acceptable_price`.
    async fn execute_swap(
        &self,
        venue: Venue,
        request: &SwapRequest,
    ) -> Result<SwapReceipt, VenueError>;

    /// Look up a swap previously executed for `order_id`, if any.
    async fn find_swap(
        &self,
        venue: Venue,
        order_id: &OrderId,
    ) -> Result<Option<SwapReceipt>, VenueError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_by_kind() {
        let unavailable = VenueError::Unavailable {
            venue: Venue::Raydium,
            message: "503".to_string(),
        };
        let timeout = VenueError::Timeout {
            venue: Venue::Meteora,
            operation: "quote",
        };
        let rejected = VenueError::Rejected {
            venue: Venue::Meteora,
            reason: "slippage".to_string(),
        };

        assert!(unavailable.is_retryable());
        assert!(timeout.is_retryable());
        assert!(!rejected.is_retryable());
        assert_eq!(timeout.venue(), Venue::Meteora);
        assert_eq!(timeout.to_string(), "Meteora quote timed out");
    }
}
