//! Simulated venue adapter.
//!
//! Stands in for real AMM venues. Prices derive from a deterministic base
//! price per pair, perturbed by a per-venue random band:
//!
//! | Venue   | Band          | Fee   |
//! |---------|---------------|-------|
//! | Raydium | -2% .. +2%    | 0.3%  |
//! | Meteora | -3% .. +2%    | 0.2%  |
//!
//! Swaps fill at `min_acceptable_price * (1 + U[0, 1%])` and are remembered
//! per order so a repeated submission returns the original receipt.

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::Rng;
use rust_decimal::Decimal;
use tracing::debug;

use crate::application::ports::{VenueAdapter, VenueError};
use crate::domain::order::OrderId;
use crate::domain::venue::{Quote, SwapReceipt, SwapRequest, TradingPair, Venue};

const HEX: &[u8; 16] = b"abcdef0123456789";

/// Simulated latency ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedVenueConfig {
    /// Quote latency range (default: 200-400ms).
    pub quote_latency: (Duration, Duration),
    /// Swap latency range (default: 2-3s).
    pub swap_latency: (Duration, Duration),
}

impl Default for SimulatedVenueConfig {
    fn default() -> Self {
        Self {
            quote_latency: (Duration::from_millis(200), Duration::from_millis(400)),
            swap_latency: (Duration::from_millis(2000), Duration::from_millis(3000)),
        }
    }
}

impl SimulatedVenueConfig {
    /// No latency at all.
    #[must_use]
    pub const fn instant() -> Self {
        Self {
            quote_latency: (Duration::ZERO, Duration::ZERO),
            swap_latency: (Duration::ZERO, Duration::ZERO),
        }
    }
}

/// In-process venue simulator covering every [`Venue`].
#[derive(Debug, Default)]
pub struct SimulatedVenueAdapter {
    config: SimulatedVenueConfig,
    receipts: RwLock<HashMap<OrderId, SwapReceipt>>,
    quote_calls: AtomicUsize,
    swap_calls: AtomicUsize,
}

impl SimulatedVenueAdapter {
    /// Create a simulator with the given latencies.
    #[must_use]
    pub fn new(config: SimulatedVenueConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Deterministic base price: `1 + (sum of chars mod 100) / 25`.
    #[must_use]
    pub fn base_price(pair: &TradingPair) -> Decimal {
        let seed: u32 = pair
            .token_in
            .chars()
            .chain(pair.token_out.chars())
            .map(u32::from)
            .fold(0, u32::wrapping_add);
        Decimal::ONE + Decimal::from(seed % 100) / Decimal::from(25)
    }

    /// Price band in basis points of the base price, and fee.
    const fn venue_profile(venue: Venue) -> (RangeInclusive<i64>, Decimal) {
        match venue {
            Venue::Raydium => (9800..=10200, Decimal::from_parts(3, 0, 0, false, 3)),
            Venue::Meteora => (9700..=10200, Decimal::from_parts(2, 0, 0, false, 3)),
        }
    }

    /// Quotes served so far.
    #[must_use]
    pub fn quote_calls(&self) -> usize {
        self.quote_calls.load(Ordering::Relaxed)
    }

    /// Swaps executed so far (repeats of a known order excluded).
    #[must_use]
    pub fn swap_calls(&self) -> usize {
        self.swap_calls.load(Ordering::Relaxed)
    }

    async fn simulate_latency((min, max): (Duration, Duration)) {
        if max.is_zero() {
            return;
        }
        let delay = if max <= min {
            min
        } else {
            rand::rng().random_range(min..=max)
        };
        tokio::time::sleep(delay).await;
    }

    fn random_tx_hash() -> String {
        let mut rng = rand::rng();
        let digits: String = (0..64)
            .map(|_| char::from(HEX[rng.random_range(0..HEX.len())]))
            .collect();
        format!("0x{digits}")
    }
}

#[async_trait]
impl VenueAdapter for SimulatedVenueAdapter {
    async fn get_quote(
        &self,
        venue: Venue,
        pair: &TradingPair,
        amount_in: Decimal,
    ) -> Result<Quote, VenueError> {
        Self::simulate_latency(self.config.quote_latency).await;
        self.quote_calls.fetch_add(1, Ordering::Relaxed);

        let (band, fee) = Self::venue_profile(venue);
        let bps = rand::rng().random_range(band);
        let price = (Self::base_price(pair) * Decimal::new(bps, 4)).round_dp(8);

        debug!(%venue, %pair, %amount_in, %price, "Simulated quote");
        Ok(Quote { venue, price, fee })
    }

    async fn execute_swap(
        &self,
        venue: Venue,
        request: &SwapRequest,
    ) -> Result<SwapReceipt, VenueError> {
        if request.min_acceptable_price <= Decimal::ZERO {
            return Err(VenueError::Rejected {
                venue,
                reason: "minimum acceptable price must be positive".to_string(),
            });
        }
        if let Some(existing) = self.receipts.read().get(&request.order_id).cloned() {
            return Ok(existing);
        }

        Self::simulate_latency(self.config.swap_latency).await;

        let slippage_bps = rand::rng().random_range(0..=100_i64);
        let receipt = SwapReceipt {
            venue,
            tx_hash: Self::random_tx_hash(),
            executed_price: (request.min_acceptable_price * Decimal::new(10_000 + slippage_bps, 4))
                .round_dp(8),
        };

        let mut receipts = self.receipts.write();
        if let Some(existing) = receipts.get(&request.order_id) {
            return Ok(existing.clone());
        }
        receipts.insert(request.order_id, receipt.clone());
        self.swap_calls.fetch_add(1, Ordering::Relaxed);
        Ok(receipt)
    }

    async fn find_swap(
        &self,
        _venue: Venue,
        order_id: &OrderId,
    ) -> Result<Option<SwapReceipt>, VenueError> {
        Ok(self.receipts.read().get(order_id).cloned())
    }
}
