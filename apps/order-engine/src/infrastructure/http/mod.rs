//! HTTP/WebSocket API adapter.
//!
//! Inbound adapter: order submission and lookup over REST, live status
//! updates over a WebSocket per order.

mod controller;
mod request;
mod response;
mod websocket;

pub use controller::{AppState, create_router};
pub use request::*;
pub use response::*;
