//! Application Ports (Driven)
//!
//! Ports define interfaces for the external systems the pipeline uses:
//! - `OrderStore`: durable order records
//! - `VenueAdapter`: liquidity venues (quotes and swaps)
//! - `EventSink`: one live subscriber connection

mod event_sink_port;
mod order_store_port;
mod venue_port;

pub use event_sink_port::{EventSink, SinkError};
#[cfg(test)]
pub use order_store_port::MockOrderStore;
pub use order_store_port::{OrderStore, StoreError};
pub use venue_port::{VenueAdapter, VenueError};
