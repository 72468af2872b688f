//! Shared test doubles.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::application::ports::{EventSink, SinkError, VenueAdapter, VenueError};
use crate::domain::order::OrderId;
use crate::domain::venue::{Quote, SwapReceipt, SwapRequest, TradingPair, Venue};
use crate::queue::{JobContext, JobFailure, JobHandler};

// =============================================================================
// Sinks
// =============================================================================

/// Sink that records every payload it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
    closed: AtomicBool,
    failing: bool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sink whose sends always fail.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            failing: true,
            ..Self::default()
        })
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Received payloads parsed as JSON.
    pub fn events(&self) -> Vec<serde_json::Value> {
        self.messages()
            .iter()
            .map(|m| serde_json::from_str(m).unwrap())
            .collect()
    }

    /// The `status` field of each received event.
    pub fn statuses(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|e| e["status"].as_str().unwrap().to_string())
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn send(&self, payload: &str) -> Result<(), SinkError> {
        if self.failing {
            return Err(SinkError::SendFailed {
                message: "broken pipe".to_string(),
            });
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(SinkError::Closed);
        }
        self.messages.lock().push(payload.to_string());
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Venues
// =============================================================================

/// Venue adapter with fixed prices and injectable failures.
#[derive(Debug, Default)]
pub struct ScriptedVenue {
    prices: HashMap<Venue, Decimal>,
    quote_failures: AtomicUsize,
    swap_failures: AtomicUsize,
    reject_swaps: AtomicBool,
    panic_on_quote: AtomicBool,
    quote_delay: Mutex<Duration>,
    quote_calls: AtomicUsize,
    swap_calls: AtomicUsize,
    lookup_calls: AtomicUsize,
    receipts: Mutex<HashMap<OrderId, SwapReceipt>>,
}

impl ScriptedVenue {
    pub fn with_prices(raydium: Decimal, meteora: Decimal) -> Self {
        Self {
            prices: HashMap::from([(Venue::Raydium, raydium), (Venue::Meteora, meteora)]),
            ..Self::default()
        }
    }

    /// Fail the next `n` quote calls with a retryable error.
    pub fn fail_next_quotes(&self, n: usize) {
        self.quote_failures.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` swap calls with a retryable error.
    pub fn fail_next_swaps(&self, n: usize) {
        self.swap_failures.store(n, Ordering::SeqCst);
    }

    /// Reject every swap permanently.
    pub fn reject_swaps(&self) {
        self.reject_swaps.store(true, Ordering::SeqCst);
    }

    /// Panic inside every quote call.
    pub fn panic_on_quotes(&self) {
        self.panic_on_quote.store(true, Ordering::SeqCst);
    }

    pub fn set_quote_delay(&self, delay: Duration) {
        *self.quote_delay.lock() = delay;
    }

    /// Pretend a swap for `order_id` already landed.
    pub fn record_swap(&self, order_id: OrderId, receipt: SwapReceipt) {
        self.receipts.lock().insert(order_id, receipt);
    }

    pub fn quote_calls(&self) -> usize {
        self.quote_calls.load(Ordering::SeqCst)
    }

    pub fn swap_calls(&self) -> usize {
        self.swap_calls.load(Ordering::SeqCst)
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl VenueAdapter for ScriptedVenue {
    async fn get_quote(
        &self,
        venue: Venue,
        _pair: &TradingPair,
        _amount_in: Decimal,
    ) -> Result<Quote, VenueError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        assert!(!self.panic_on_quote.load(Ordering::SeqCst), "adapter bug");
        let delay = *self.quote_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if Self::take_failure(&self.quote_failures) {
            return Err(VenueError::Unavailable {
                venue,
                message: "scripted quote failure".to_string(),
            });
        }
        Ok(Quote {
            venue,
            price: self.prices.get(&venue).copied().unwrap_or(Decimal::ONE),
            fee: Decimal::new(3, 3),
        })
    }

    async fn execute_swap(
        &self,
        venue: Venue,
        request: &SwapRequest,
    ) -> Result<SwapReceipt, VenueError> {
        self.swap_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_swaps.load(Ordering::SeqCst) {
            return Err(VenueError::Rejected {
                venue,
                reason: "scripted rejection".to_string(),
            });
        }
        if Self::take_failure(&self.swap_failures) {
            return Err(VenueError::Unavailable {
                venue,
                message: "scripted swap failure".to_string(),
            });
        }
        let receipt = SwapReceipt {
            venue,
            tx_hash: format!("0x{}", request.order_id.as_uuid().simple()),
            executed_price: request.min_acceptable_price,
        };
        self.receipts.lock().insert(request.order_id, receipt.clone());
        Ok(receipt)
    }

    async fn find_swap(
        &self,
        _venue: Venue,
        order_id: &OrderId,
    ) -> Result<Option<SwapReceipt>, VenueError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.receipts.lock().get(order_id).cloned())
    }
}

// =============================================================================
// Queue
// =============================================================================

/// Handler that accepts every job without doing anything.
#[derive(Debug, Default)]
pub struct NoopHandler;

#[async_trait]
impl JobHandler for NoopHandler {
    async fn handle(&self, _ctx: JobContext) -> Result<(), JobFailure> {
        Ok(())
    }
}
