//! Venue Router
//!
//! Collects quotes from every enabled venue in parallel, picks the best
//! price and checks it against the order's limit. Every venue call runs
//! under a deadline; an expired deadline is reported as a retryable
//! [`VenueError::Timeout`].

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::application::ports::{VenueAdapter, VenueError};
use crate::domain::order::OrderId;
use crate::domain::venue::{Quote, SwapReceipt, SwapRequest, TradingPair, Venue};
use crate::observability::metrics;

/// Per-call deadlines for venue operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterTimeouts {
    /// Deadline for a quote or a swap lookup.
    pub quote: Duration,
    /// Deadline for executing a swap.
    pub swap: Duration,
}

impl Default for RouterTimeouts {
    fn default() -> Self {
        Self {
            quote: Duration::from_secs(5),
            swap: Duration::from_secs(15),
        }
    }
}

/// Outcome of a successful routing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    /// Winning quote.
    pub best: Quote,
    /// All quotes, in venue order.
    pub quotes: Vec<Quote>,
}

/// Routing errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    /// A venue call failed.
    #[error(transparent)]
    Venue(#[from] VenueError),

    /// The best available price is below the order's limit.
    #[error("best price {} below limit {limit}", .best.price)]
    LimitNotMet {
        /// Best quote found.
        best: Quote,
        /// Order limit price.
        limit: Decimal,
    },

    /// No venues are enabled.
    #[error("no venues enabled")]
    NoVenues,
}

/// Pick the highest price. On equal prices the later quote wins.
#[must_use]
pub fn select_best(quotes: &[Quote]) -> Option<&Quote> {
    quotes.iter().fold(None, |best, quote| match best {
        Some(current) if quote.price < current.price => Some(current),
        _ => Some(quote),
    })
}

/// Routes orders across the enabled venues of one adapter.
pub struct VenueRouter<V: VenueAdapter> {
    adapter: Arc<V>,
    venues: Vec<Venue>,
    timeouts: RouterTimeouts,
}

impl<V: VenueAdapter> VenueRouter<V> {
    /// Create a router over `venues`, queried in the given order.
    #[must_use]
    pub const fn new(adapter: Arc<V>, venues: Vec<Venue>, timeouts: RouterTimeouts) -> Self {
        Self {
            adapter,
            venues,
            timeouts,
        }
    }

    /// Quote every enabled venue concurrently.
    ///
    /// Fails with the first venue error; quotes are returned in venue order.
    pub async fn quote_all(
        &self,
        pair: &TradingPair,
        amount_in: Decimal,
    ) -> Result<Vec<Quote>, VenueError> {
        try_join_all(
            self.venues
                .iter()
                .map(|&venue| self.quote_one(venue, pair, amount_in)),
        )
        .await
    }

    /// Quote all venues, choose the best and enforce `limit_price`.
    pub async fn route(
        &self,
        pair: &TradingPair,
        amount_in: Decimal,
        limit_price: Decimal,
    ) -> Result<RoutingDecision, RoutingError> {
        let quotes = self.quote_all(pair, amount_in).await?;
        let best = select_best(&quotes).cloned().ok_or(RoutingError::NoVenues)?;

        info!(
            pair = %pair,
            venue = %best.venue,
            price = %best.price,
            limit = %limit_price,
            quotes = ?quotes.iter().map(|q| (q.venue, q.price)).collect::<Vec<_>>(),
            "Routing decision"
        );

        if best.price < limit_price {
            return Err(RoutingError::LimitNotMet {
                best,
                limit: limit_price,
            });
        }
        Ok(RoutingDecision { best, quotes })
    }

    /// Execute a swap on `venue` under the swap deadline.
    pub async fn execute_swap(
        &self,
        venue: Venue,
        request: &SwapRequest,
    ) -> Result<SwapReceipt, VenueError> {
        with_deadline(
            venue,
            "swap",
            self.timeouts.swap,
            self.adapter.execute_swap(venue, request),
        )
        .await
    }

    /// Look up a swap already executed for `order_id` on `venue`.
    pub async fn find_swap(
        &self,
        venue: Venue,
        order_id: &OrderId,
    ) -> Result<Option<SwapReceipt>, VenueError> {
        with_deadline(
            venue,
            "lookup",
            self.timeouts.quote,
            self.adapter.find_swap(venue, order_id),
        )
        .await
    }

    async fn quote_one(
        &self,
        venue: Venue,
        pair: &TradingPair,
        amount_in: Decimal,
    ) -> Result<Quote, VenueError> {
        let started = Instant::now();
        let result = with_deadline(
            venue,
            "quote",
            self.timeouts.quote,
            self.adapter.get_quote(venue, pair, amount_in),
        )
        .await;

        metrics::record_venue_quote(venue, result.is_ok(), started.elapsed());
        match &result {
            Ok(quote) => debug!(%venue, price = %quote.price, fee = %quote.fee, "Quote received"),
            Err(e) => debug!(%venue, error = %e, "Quote failed"),
        }
        result
    }
}

async fn with_deadline<T>(
    venue: Venue,
    operation: &'static str,
    deadline: Duration,
    call: impl Future<Output = Result<T, VenueError>>,
) -> Result<T, VenueError> {
    tokio::time::timeout(deadline, call)
        .await
        .map_err(|_| VenueError::Timeout { venue, operation })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedVenue;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn quote(venue: Venue, price: Decimal) -> Quote {
        Quote {
            venue,
            price,
            fee: dec!(0.003),
        }
    }

    fn router(venue: ScriptedVenue) -> (VenueRouter<ScriptedVenue>, Arc<ScriptedVenue>) {
        let adapter = Arc::new(venue);
        let router = VenueRouter::new(
            Arc::clone(&adapter),
            Venue::ALL.to_vec(),
            RouterTimeouts {
                quote: Duration::from_millis(100),
                swap: Duration::from_millis(100),
            },
        );
        (router, adapter)
    }

    fn pair() -> TradingPair {
        TradingPair::new("SOL", "USDC")
    }

    #[test]
    fn select_best_prefers_higher_price() {
        let quotes = vec![quote(Venue::Raydium, dec!(1.9)), quote(Venue::Meteora, dec!(2.1))];
        assert_eq!(select_best(&quotes).unwrap().venue, Venue::Meteora);
    }

    #[test]
    fn select_best_tie_goes_to_later_quote() {
        let quotes = vec![quote(Venue::Raydium, dec!(2)), quote(Venue::Meteora, dec!(2))];
        assert_eq!(select_best(&quotes).unwrap().venue, Venue::Meteora);
        assert!(select_best(&[]).is_none());
    }

    proptest! {
        #[test]
        fn select_best_returns_maximum(prices in prop::collection::vec(1u32..10_000, 1..8)) {
            let quotes: Vec<Quote> = prices
                .iter()
                .map(|&p| quote(Venue::Raydium, Decimal::from(p)))
                .collect();
            let max = prices.iter().copied().max().unwrap();
            let last_max_index = prices.iter().rposition(|&p| p == max).unwrap();

            let best = select_best(&quotes).unwrap();
            prop_assert_eq!(best.price, Decimal::from(max));
            prop_assert!(std::ptr::eq(best, &quotes[last_max_index]));
        }
    }

    #[tokio::test]
    async fn route_picks_best_venue_above_limit() {
        let (router, adapter) = router(ScriptedVenue::with_prices(dec!(1.9), dec!(2.1)));

        let decision = router.route(&pair(), dec!(1), dec!(2)).await.unwrap();

        assert_eq!(decision.best.venue, Venue::Meteora);
        assert_eq!(decision.quotes.len(), 2);
        assert_eq!(decision.quotes[0].venue, Venue::Raydium);
        assert_eq!(adapter.quote_calls(), 2);
    }

    #[tokio::test]
    async fn route_rejects_when_best_below_limit() {
        let (router, _) = router(ScriptedVenue::with_prices(dec!(1.9), dec!(2.1)));

        let err = router.route(&pair(), dec!(1), dec!(1000000)).await.unwrap_err();

        match err {
            RoutingError::LimitNotMet { best, limit } => {
                assert_eq!(best.price, dec!(2.1));
                assert_eq!(limit, dec!(1000000));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn route_propagates_venue_failure() {
        let (router, adapter) = router(ScriptedVenue::with_prices(dec!(2), dec!(2)));
        adapter.fail_next_quotes(1);

        let err = router.route(&pair(), dec!(1), dec!(1)).await.unwrap_err();
        assert!(matches!(err, RoutingError::Venue(ref e) if e.is_retryable()));
    }

    #[tokio::test]
    async fn slow_venue_times_out() {
        let (router, adapter) = router(ScriptedVenue::with_prices(dec!(2), dec!(2)));
        adapter.set_quote_delay(Duration::from_millis(500));

        let err = router.quote_all(&pair(), dec!(1)).await.unwrap_err();
        assert!(matches!(
            err,
            VenueError::Timeout {
                operation: "quote",
                ..
            }
        ));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn no_venues_is_an_error() {
        let adapter = Arc::new(ScriptedVenue::with_prices(dec!(2), dec!(2)));
        let router = VenueRouter::new(adapter, Vec::new(), RouterTimeouts::default());

        let err = router.route(&pair(), dec!(1), dec!(1)).await.unwrap_err();
        assert_eq!(err, RoutingError::NoVenues);
    }
}
