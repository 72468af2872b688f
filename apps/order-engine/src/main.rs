//! Order Engine Binary
//!
//! Starts the order execution engine: HTTP/WebSocket API, job queue workers
//! and simulated venues.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin order-engine
//! ```
//!
//! # Environment Variables
//!
//! - `ORDER_ENGINE_CONFIG`: Path to the YAML config (default: `config.yaml`;
//!   a missing file means built-in defaults)
//! - `RUST_LOG`: Log filter (default: `warn,order_engine=info`)
//! - `OTEL_ENABLED`, `OTEL_EXPORTER_OTLP_ENDPOINT`, `OTEL_SERVICE_NAME`:
//!   OpenTelemetry export

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use order_engine::config::{Config, StoreBackend, load_config_or_default};
use order_engine::infrastructure::http::{AppState, create_router};
use order_engine::infrastructure::persistence::{InMemoryOrderStore, JsonFileOrderStore};
use order_engine::infrastructure::venues::SimulatedVenueAdapter;
use order_engine::observability::{MetricsConfig, init_metrics};
use order_engine::telemetry::init_telemetry;
use order_engine::{
    JobQueue, NotificationHub, OrderExecutor, OrderStore, RecoverOrdersUseCase, SubmitOrderUseCase,
    VenueRouter,
};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Time allowed for open connections after the hub closes them.
const SERVER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let config_path = std::env::var("ORDER_ENGINE_CONFIG").ok();
    let config =
        load_config_or_default(config_path.as_deref()).context("failed to load configuration")?;

    let _telemetry = init_telemetry(&config.observability)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Order Engine");
    log_config(&config);

    if config.observability.metrics.enabled {
        let addr: SocketAddr = config.observability.metrics.listen_addr.parse()?;
        init_metrics(&MetricsConfig::with_addr(addr))?;
    }

    match config.store.backend {
        StoreBackend::Memory => run(config, Arc::new(InMemoryOrderStore::new())).await,
        StoreBackend::File => {
            let store = JsonFileOrderStore::open(&config.store.path)
                .await
                .context("failed to open order store")?;
            tracing::info!(path = %store.dir().display(), "File order store opened");
            run(config, Arc::new(store)).await
        }
    }
}

/// Wire the services over `store` and serve until a shutdown signal.
async fn run<S>(config: Config, store: Arc<S>) -> anyhow::Result<()>
where
    S: OrderStore + 'static,
{
    let hub = Arc::new(NotificationHub::new());

    let venues = Arc::new(SimulatedVenueAdapter::new(
        config.venues.simulation.to_simulated_config(),
    ));
    let router = VenueRouter::new(
        venues,
        config.venues.enabled.clone(),
        config.venues.router_timeouts(),
    );
    let executor = Arc::new(OrderExecutor::new(
        Arc::clone(&store),
        router,
        Arc::clone(&hub),
    ));
    let queue = JobQueue::start(config.queue.to_queue_config(), executor);

    if config.recovery.enabled {
        let report = RecoverOrdersUseCase::new(Arc::clone(&store), queue.clone())
            .execute()
            .await
            .context("startup recovery failed")?;
        tracing::info!(
            found = report.found,
            enqueued = report.enqueued,
            skipped = report.skipped,
            "Startup recovery complete"
        );
    }

    let state = AppState {
        submit_order: Arc::new(SubmitOrderUseCase::new(
            Arc::clone(&store),
            queue.clone(),
            Arc::clone(&hub),
        )),
        store,
        hub: Arc::clone(&hub),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let app = create_router(state);

    let addr = config.server.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, "HTTP server starting");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health");
    tracing::info!("  POST /api/orders/execute");
    tracing::info!("  GET  /api/orders/execute?orderId=<id> (WebSocket)");
    tracing::info!("  GET  /api/orders/{{id}}");

    let stop_accepting = CancellationToken::new();
    let mut server = tokio::spawn({
        let stop = stop_accepting.clone();
        async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(stop.cancelled_owned())
                .await
            {
                tracing::error!("HTTP server error: {e}");
            }
        }
    });

    tracing::info!("Order engine ready");

    let server_finished = tokio::select! {
        () = shutdown_signal() => false,
        _ = &mut server => {
            tracing::error!("HTTP server stopped unexpectedly");
            true
        }
    };

    // Stop intake, drain workers, then release subscribers.
    stop_accepting.cancel();

    let timeout = config.queue.shutdown_timeout();
    tracing::info!(timeout_secs = timeout.as_secs(), "Graceful shutdown started");
    let report = queue.shutdown(timeout).await;
    if report.drained {
        tracing::info!("Job queue drained");
    } else {
        tracing::warn!(abandoned = report.abandoned, "Job queue shutdown timed out");
    }

    hub.close_all();

    if !server_finished && tokio::time::timeout(SERVER_DRAIN_TIMEOUT, server).await.is_err() {
        tracing::warn!("HTTP connections still open after drain timeout");
    }

    tracing::info!("Order engine stopped");
    Ok(())
}

fn log_config(config: &Config) {
    tracing::info!(
        http_port = config.server.http_port,
        concurrency = config.queue.concurrency,
        attempts = config.queue.attempts,
        rate_limit_max = config.queue.rate_limit_max,
        venues = ?config.venues.enabled,
        store = ?config.store.backend,
        recovery = config.recovery.enabled,
        "Configuration loaded"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
