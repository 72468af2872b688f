//! Observability module for metrics.
//!
//! Prometheus export of order, job and venue metrics. Tracing setup lives
//! in `crate::telemetry`.

pub mod metrics;

pub use self::metrics::{MetricsConfig, MetricsError, init_metrics};
