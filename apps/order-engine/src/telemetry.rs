//! Tracing Setup
//!
//! Console logging (pretty or JSON) plus optional OpenTelemetry export over
//! OTLP gRPC.
//!
//! # Configuration
//!
//! Settings come from the `observability` config section. These environment
//! variables override it:
//!
//! - `RUST_LOG`: filter directives (default: `warn,order_engine=<level>`)
//! - `OTEL_ENABLED`: `true`/`false`, overrides `tracing.otel_enabled`
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP gRPC endpoint
//! - `OTEL_SERVICE_NAME`: service name for traces
//!
//! # Usage
//!
//! ```rust,ignore
//! use order_engine::telemetry::init_telemetry;
//!
//! let _guard = init_telemetry(&config.observability)?;
//! ```

use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, ObservabilityConfig};

/// Guard that shuts down the tracer provider on drop.
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    /// Whether spans are exported over OTLP.
    #[must_use]
    pub const fn is_exporting(&self) -> bool {
        self.provider.is_some()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("Error shutting down tracer provider: {e:?}");
        }
    }
}

/// Telemetry setup errors.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// A global subscriber is already installed.
    #[error("tracing subscriber already initialized: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// Filter from `RUST_LOG`, falling back to the configured level for this
/// crate and `warn` for dependencies.
#[must_use]
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,order_engine={level}")))
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| v != "false" && v != "0")
}

/// Initialize logging and, when enabled, OTLP span export.
///
/// Returns a guard that will shut down the tracer provider when dropped.
///
/// # Errors
///
/// Returns an error if a global subscriber was already installed.
pub fn init_telemetry(config: &ObservabilityConfig) -> Result<TelemetryGuard, TelemetryError> {
    let env_filter = build_filter(&config.logging.level);

    let fmt_layer = match config.logging.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(false)
            .boxed(),
    };

    let otel_enabled = env_flag("OTEL_ENABLED").unwrap_or(config.tracing.otel_enabled);
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| config.tracing.endpoint.clone());
    let service_name = std::env::var("OTEL_SERVICE_NAME")
        .unwrap_or_else(|_| config.tracing.service_name.clone());

    let provider = if otel_enabled {
        match opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&endpoint)
            .build()
        {
            Ok(exporter) => Some(
                SdkTracerProvider::builder()
                    .with_simple_exporter(exporter)
                    .build(),
            ),
            Err(e) => {
                eprintln!("Failed to create OTLP exporter: {e:?}, falling back to console logging");
                None
            }
        }
    } else {
        None
    };

    let otel_layer = provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name.clone()))
    });

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(otel_layer)
        .with(env_filter)
        .try_init()?;

    if provider.is_some() {
        tracing::info!(
            service_name = %service_name,
            endpoint = %endpoint,
            "OpenTelemetry initialized"
        );
    } else {
        tracing::info!("OpenTelemetry disabled, using console logging only");
    }

    Ok(TelemetryGuard { provider })
}
