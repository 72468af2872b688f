//! Infrastructure Layer
//!
//! Adapters for the ports defined in the application layer:
//!
//! - **Driven Adapters (Outbound)**
//!   - `persistence/`: Order stores (in-memory, JSON files)
//!   - `venues/`: Simulated venue adapter
//!   - `sink`: Channel-backed event sink feeding WebSocket writers
//!
//! - **Driver Adapters (Inbound)**
//!   - `http/`: REST + WebSocket API

pub mod http;
pub mod persistence;
pub mod sink;
pub mod venues;
