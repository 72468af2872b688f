//! Venue value objects: venues, trading pairs, quotes and swap receipts.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::order::OrderId;

/// A liquidity venue an order can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    /// Raydium AMM.
    #[serde(alias = "raydium")]
    Raydium,
    /// Meteora DLMM.
    #[serde(alias = "meteora")]
    Meteora,
}

impl Venue {
    /// Every venue the engine knows how to talk to, in default routing order.
    pub const ALL: [Self; 2] = [Self::Raydium, Self::Meteora];

    /// Display name, as sent in lifecycle events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raydium => "Raydium",
            Self::Meteora => "Meteora",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Venue name that does not match any known venue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown venue: {0}")]
pub struct UnknownVenue(pub String);

impl FromStr for Venue {
    type Err = UnknownVenue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|venue| venue.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVenue(s.to_string()))
    }
}

/// The pair of tokens being swapped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingPair {
    /// Token sold.
    pub token_in: String,
    /// Token bought.
    pub token_out: String,
}

impl TradingPair {
    /// Create a trading pair.
    #[must_use]
    pub fn new(token_in: impl Into<String>, token_out: impl Into<String>) -> Self {
        Self {
            token_in: token_in.into(),
            token_out: token_out.into(),
        }
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.token_in, self.token_out)
    }
}

/// A price offered by one venue for a swap.
///
/// `price` is units of `token_out` per unit of `token_in`; higher is better
/// for the seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Venue that produced the quote.
    pub venue: Venue,
    /// Offered price.
    pub price: Decimal,
    /// Fee rate charged by the venue (0.003 = 0.3%).
    pub fee: Decimal,
}

/// Instruction to execute a swap on a venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    /// Client reference; venues use it to recognise a repeated submission.
    pub order_id: OrderId,
    /// Tokens being swapped.
    pub pair: TradingPair,
    /// Amount of `token_in` sold.
    pub amount_in: Decimal,
    /// The swap must not execute below this price.
    pub min_acceptable_price: Decimal,
}

/// Result of an executed swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapReceipt {
    /// Venue that executed the swap.
    pub venue: Venue,
    /// On-chain transaction hash.
    pub tx_hash: String,
    /// Realised execution price.
    pub executed_price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn venue_parses_case_insensitively() {
        assert_eq!("raydium".parse::<Venue>(), Ok(Venue::Raydium));
        assert_eq!(" METEORA ".parse::<Venue>(), Ok(Venue::Meteora));
        assert!("orca".parse::<Venue>().is_err());
    }

    #[test]
    fn venue_serializes_as_display_name() {
        let json = serde_json::to_string(&Venue::Meteora).unwrap();
        assert_eq!(json, "\"Meteora\"");

        let parsed: Venue = serde_json::from_str("\"raydium\"").unwrap();
        assert_eq!(parsed, Venue::Raydium);
    }

    #[test]
    fn trading_pair_display() {
        assert_eq!(TradingPair::new("SOL", "USDC").to_string(), "SOL/USDC");
    }
}
