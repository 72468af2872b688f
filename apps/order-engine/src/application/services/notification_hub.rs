//! Notification Hub
//!
//! Per-order fan-out of lifecycle events to live subscriber connections.
//!
//! # Design
//!
//! The hub tracks:
//! - Which sinks are attached to each order
//! - A hub-wide closed flag, set by [`NotificationHub::close_all`]
//!
//! Publishing never fails the caller. Sinks that are closed or error on
//! send are dropped from the order's set, and an order whose set becomes
//! empty is removed so the map does not grow with finished orders.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::application::ports::EventSink;
use crate::domain::events::OrderEvent;
use crate::domain::order::OrderId;

// =============================================================================
// Types
// =============================================================================

/// Shared handle to a subscriber connection.
pub type SharedSink = Arc<dyn EventSink>;

/// Identifier of one subscription, used to detach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

/// Hub errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    /// `close_all` already ran; no new subscribers are accepted.
    #[error("notification hub is closed")]
    Closed,
}

/// Snapshot of hub usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Orders with at least one subscriber.
    pub orders: usize,
    /// Live subscriptions across all orders.
    pub subscribers: usize,
    /// Whether `close_all` has run.
    pub closed: bool,
}

struct Subscriber {
    id: SinkId,
    sink: SharedSink,
}

// =============================================================================
// Hub
// =============================================================================

/// Fan-out registry keyed by order ID.
#[derive(Default)]
pub struct NotificationHub {
    subscribers: RwLock<HashMap<OrderId, Vec<Subscriber>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl std::fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationHub")
            .field("orders", &self.order_count())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl NotificationHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `sink` to `order_id`.
    ///
    /// Adding a sink that is already attached to the order is a no-op and
    /// returns the existing ID. After `close_all` the sink is closed
    /// immediately and `HubError::Closed` is returned.
    pub fn subscribe(&self, order_id: OrderId, sink: SharedSink) -> Result<SinkId, HubError> {
        // Checked under the lock: close_all sets the flag before draining.
        let mut subscribers = self.subscribers.write();
        if self.is_closed() {
            drop(subscribers);
            sink.close();
            return Err(HubError::Closed);
        }

        let entries = subscribers.entry(order_id).or_default();
        if let Some(existing) = entries.iter().find(|entry| Arc::ptr_eq(&entry.sink, &sink)) {
            return Ok(existing.id);
        }

        let id = SinkId(self.next_id.fetch_add(1, Ordering::Relaxed));
        entries.push(Subscriber { id, sink });
        debug!(%order_id, subscribers = entries.len(), "Subscriber attached");
        Ok(id)
    }

    /// Detach one subscription. Unknown IDs are ignored.
    pub fn unsubscribe(&self, order_id: OrderId, sink_id: SinkId) {
        let mut subscribers = self.subscribers.write();
        if let Some(entries) = subscribers.get_mut(&order_id) {
            entries.retain(|entry| entry.id != sink_id);
            if entries.is_empty() {
                subscribers.remove(&order_id);
            }
        }
    }

    /// Serialize `event` once and deliver it to every sink of `order_id`.
    ///
    /// Returns the number of sinks that accepted the event.
    pub fn publish(&self, order_id: OrderId, event: &OrderEvent) -> usize {
        if !self.subscribers.read().contains_key(&order_id) {
            return 0;
        }

        let payload = match event.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(%order_id, error = %e, "Failed to serialize order event");
                return 0;
            }
        };

        let mut subscribers = self.subscribers.write();
        let Some(entries) = subscribers.get_mut(&order_id) else {
            return 0;
        };

        let before = entries.len();
        entries.retain(|entry| {
            if entry.sink.is_closed() {
                return false;
            }
            match entry.sink.send(&payload) {
                Ok(()) => true,
                Err(e) => {
                    debug!(%order_id, error = %e, "Dropping subscriber after failed send");
                    false
                }
            }
        });
        let delivered = entries.len();
        if delivered < before {
            debug!(%order_id, dropped = before - delivered, "Pruned dead subscribers");
        }
        if entries.is_empty() {
            subscribers.remove(&order_id);
        }
        delivered
    }

    /// Close every sink, clear all subscriptions and refuse new ones.
    pub fn close_all(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let drained: Vec<Subscriber> = self
            .subscribers
            .write()
            .drain()
            .flat_map(|(_, entries)| entries)
            .collect();
        for entry in &drained {
            entry.sink.close();
        }
        debug!(closed = drained.len(), "Closed all subscribers");
    }

    /// Number of live subscriptions for `order_id`.
    #[must_use]
    pub fn subscriber_count(&self, order_id: &OrderId) -> usize {
        self.subscribers.read().get(order_id).map_or(0, Vec::len)
    }

    /// Number of orders with at least one subscriber.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Current subscription counts.
    #[must_use]
    pub fn stats(&self) -> HubStats {
        let subscribers = self.subscribers.read();
        HubStats {
            orders: subscribers.len(),
            subscribers: subscribers.values().map(Vec::len).sum(),
            closed: self.is_closed(),
        }
    }

    /// Whether `close_all` has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
