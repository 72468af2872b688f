//! Domain Layer
//!
//! Pure business types: the `Order` aggregate and its status lifecycle,
//! venue value objects, and the lifecycle events pushed to subscribers.
//! Nothing here performs I/O.

pub mod errors;
pub mod events;
pub mod order;
pub mod venue;

pub use errors::OrderError;
pub use events::OrderEvent;
pub use order::{NewOrder, Order, OrderId, OrderStatus, OrderType};
pub use venue::{Quote, SwapReceipt, SwapRequest, TradingPair, UnknownVenue, Venue};
