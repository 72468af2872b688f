// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_collect,
        clippy::items_after_statements
    )
)]

//! Order Engine - Rust Core Library
//!
//! Limit order execution pipeline: orders are accepted over HTTP, persisted,
//! handed to a job queue and driven through
//! `pending -> routing -> building -> submitted -> confirmed` (or `failed`)
//! by a worker pool. Every transition is persisted before it is pushed to
//! live subscribers.
//!
//! # Architecture (Clean Architecture + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: `Order` aggregate, status lifecycle, venue value objects,
//!   lifecycle events
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: Interfaces for external systems (`OrderStore`, `VenueAdapter`, `EventSink`)
//!   - `services`: `VenueRouter`, `NotificationHub`
//!   - `use_cases`: `SubmitOrder`, `ExecuteOrder` (the order executor), `RecoverOrders`
//!
//! - **Queue**: In-process job queue with retry, backoff, concurrency cap
//!   and rate limiting
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `persistence`: In-memory and JSON-file order stores
//!   - `sink`: Channel-backed event sink for WebSocket writers
//!   - `venues`: Simulated venue adapter
//!   - `http`: Axum REST + WebSocket adapter

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases, services and port definitions.
pub mod application;

/// Job queue - retry, backoff, concurrency and rate limiting.
pub mod queue;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting Modules
// =============================================================================

/// Configuration loading (YAML + environment interpolation).
pub mod config;

/// API error codes and HTTP error responses.
pub mod error;

/// Metrics recording and Prometheus exporter.
pub mod observability;

/// Tracing subscriber and OpenTelemetry setup.
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use application::ports::{EventSink, OrderStore, SinkError, StoreError, VenueAdapter, VenueError};
pub use application::services::{NotificationHub, SinkId, VenueRouter};
pub use application::use_cases::{OrderExecutor, RecoverOrdersUseCase, SubmitOrderUseCase};
pub use domain::{
    events::OrderEvent,
    order::{NewOrder, Order, OrderId, OrderStatus},
    venue::{Quote, SwapReceipt, SwapRequest, TradingPair, Venue},
};
pub use queue::{JobContext, JobFailure, JobHandler, JobOptions, JobQueue, QueueConfig};
