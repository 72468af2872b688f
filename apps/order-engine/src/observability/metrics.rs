//! Prometheus metrics for the order engine.
//!
//! Recording functions are cheap no-ops until [`init_metrics`] installs a
//! recorder, so library code and tests can call them unconditionally.
//!
//! # Example
//!
//! ```ignore
//! use order_engine::observability::{init_metrics, MetricsConfig};
//!
//! init_metrics(&MetricsConfig::default())?;
//! order_engine::observability::metrics::record_order_submitted();
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::domain::order::OrderStatus;
use crate::domain::venue::Venue;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for latency measurements (in seconds).
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9090)),
            // 1ms to 30s: quotes land in the low buckets, swaps in the high ones
            latency_buckets: vec![
                0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ],
        }
    }
}

impl MetricsConfig {
    /// Create a new metrics configuration with custom address.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            ..Default::default()
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.latency_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Order Metrics
// ============================================================================

/// Record an accepted order.
pub fn record_order_submitted() {
    counter!("orders_submitted_total").increment(1);
}

/// Record a persisted status change.
pub fn record_order_transition(status: OrderStatus) {
    counter!("order_transitions_total", "status" => status.as_str()).increment(1);
}

// ============================================================================
// Queue Metrics
// ============================================================================

/// Record a job lifecycle outcome.
///
/// # Arguments
///
/// * `outcome` - One of `enqueued`, `completed`, `retried`, `failed`
pub fn record_job_outcome(outcome: &'static str) {
    counter!("jobs_total", "outcome" => outcome).increment(1);
}

/// Record how long one job attempt ran.
pub fn record_job_duration(elapsed: Duration) {
    histogram!("job_duration_seconds").record(elapsed.as_secs_f64());
}

// ============================================================================
// Venue Metrics
// ============================================================================

/// Record a quote request against a venue.
pub fn record_venue_quote(venue: Venue, ok: bool, elapsed: Duration) {
    let outcome = if ok { "ok" } else { "error" };
    counter!(
        "venue_quotes_total",
        "venue" => venue.as_str(),
        "outcome" => outcome
    )
    .increment(1);

    histogram!("venue_quote_latency_seconds", "venue" => venue.as_str())
        .record(elapsed.as_secs_f64());
}
