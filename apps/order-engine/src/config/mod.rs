//! Configuration module for the order engine.
//!
//! YAML configuration with `${VAR}` / `${VAR:-default}` environment
//! interpolation. Every section and field has a default, so an empty file
//! (or no file at all) is a valid configuration.
//!
//! # Usage
//!
//! ```rust,ignore
//! use order_engine::config::{Config, load_config};
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Fall back to defaults when the file does not exist
//! let config = load_config_or_default(Some("custom/config.yaml"))?;
//!
//! println!("HTTP port: {}", config.server.http_port);
//! ```

mod observability;
mod queue;
mod recovery;
mod server;
mod store;
mod venues;

use std::collections::HashSet;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use observability::{LogFormat, LoggingConfig, MetricsSettings, ObservabilityConfig, TracingConfig};
pub use queue::QueueSettings;
pub use recovery::RecoveryConfig;
pub use server::ServerConfig;
pub use store::{StoreBackend, StoreConfig};
pub use venues::{SimulationConfig, VenuesConfig};

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Job queue configuration.
    #[serde(default)]
    pub queue: QueueSettings,
    /// Venue configuration.
    #[serde(default)]
    pub venues: VenuesConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Startup recovery configuration.
    #[serde(default)]
    pub recovery: RecoveryConfig,
    /// Order store configuration.
    #[serde(default)]
    pub store: StoreConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Like [`load_config`], but a missing file yields the defaults.
///
/// # Errors
///
/// Returns a `ConfigError` if an existing file cannot be read, parsed, or
/// validated.
pub fn load_config_or_default(path: Option<&str>) -> Result<Config, ConfigError> {
    match load_config(path) {
        Err(ConfigError::ReadError { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            let config = Config::default();
            validate_config(&config)?;
            Ok(config)
        }
        other => other,
    }
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = if interpolated.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml_bw::from_str(&interpolated)?
    };
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax. Unset or empty
/// variables without a default become empty strings.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |caps: &regex::Captures<'_>| {
        let default_value = caps.get(2).map_or("", |m| m.as_str());
        match caps.get(1).map(|m| std::env::var(m.as_str())) {
            Some(Ok(v)) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

    // Queue
    let queue = &config.queue;
    if queue.concurrency == 0 {
        return invalid("queue.concurrency must be at least 1");
    }
    if queue.attempts == 0 {
        return invalid("queue.attempts must be at least 1");
    }
    if queue.backoff_max_ms < queue.backoff_base_ms {
        return invalid("queue.backoff_max_ms must not be below queue.backoff_base_ms");
    }
    if !(0.0..=1.0).contains(&queue.jitter) {
        return invalid("queue.jitter must be between 0.0 and 1.0");
    }
    if queue.rate_limit_max > 0 && queue.rate_limit_window_ms == 0 {
        return invalid("queue.rate_limit_window_ms must be positive when rate limiting");
    }

    // Venues
    let venues = &config.venues;
    if venues.enabled.is_empty() {
        return invalid("venues.enabled must list at least one venue");
    }
    let unique: HashSet<_> = venues.enabled.iter().collect();
    if unique.len() != venues.enabled.len() {
        return invalid("venues.enabled must not repeat a venue");
    }
    if venues.quote_timeout_ms == 0 || venues.swap_timeout_ms == 0 {
        return invalid("venues timeouts must be positive");
    }
    let sim = &venues.simulation;
    if sim.quote_latency_min_ms > sim.quote_latency_max_ms
        || sim.swap_latency_min_ms > sim.swap_latency_max_ms
    {
        return invalid("venues.simulation latency min must not exceed max");
    }

    // Observability
    let level = config.observability.logging.level.to_lowercase();
    if !observability::LOG_LEVELS.contains(&level.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "observability.logging.level must be one of: {:?}",
            observability::LOG_LEVELS
        )));
    }
    if config.observability.metrics.enabled
        && config
            .observability
            .metrics
            .listen_addr
            .parse::<SocketAddr>()
            .is_err()
    {
        return invalid("observability.metrics.listen_addr must be a socket address");
    }

    // Store
    if config.store.backend == StoreBackend::File && config.store.path.trim().is_empty() {
        return invalid("store.path is required for the file backend");
    }

    Ok(())
}
