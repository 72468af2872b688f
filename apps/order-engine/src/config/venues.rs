//! Venue routing and simulation configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::services::RouterTimeouts;
use crate::domain::venue::Venue;
use crate::infrastructure::venues::SimulatedVenueConfig;

/// Venue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenuesConfig {
    /// Venues to quote, in routing order.
    #[serde(default = "default_enabled")]
    pub enabled: Vec<Venue>,
    /// Per-quote deadline.
    #[serde(default = "default_quote_timeout_ms")]
    pub quote_timeout_ms: u64,
    /// Per-swap deadline.
    #[serde(default = "default_swap_timeout_ms")]
    pub swap_timeout_ms: u64,
    /// Simulated venue latencies.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Default for VenuesConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            quote_timeout_ms: default_quote_timeout_ms(),
            swap_timeout_ms: default_swap_timeout_ms(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl VenuesConfig {
    /// Router deadlines.
    #[must_use]
    pub const fn router_timeouts(&self) -> RouterTimeouts {
        RouterTimeouts {
            quote: Duration::from_millis(self.quote_timeout_ms),
            swap: Duration::from_millis(self.swap_timeout_ms),
        }
    }
}

/// Latency ranges of the simulated venues, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Fastest quote.
    #[serde(default = "default_quote_latency_min_ms")]
    pub quote_latency_min_ms: u64,
    /// Slowest quote.
    #[serde(default = "default_quote_latency_max_ms")]
    pub quote_latency_max_ms: u64,
    /// Fastest swap.
    #[serde(default = "default_swap_latency_min_ms")]
    pub swap_latency_min_ms: u64,
    /// Slowest swap.
    #[serde(default = "default_swap_latency_max_ms")]
    pub swap_latency_max_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            quote_latency_min_ms: default_quote_latency_min_ms(),
            quote_latency_max_ms: default_quote_latency_max_ms(),
            swap_latency_min_ms: default_swap_latency_min_ms(),
            swap_latency_max_ms: default_swap_latency_max_ms(),
        }
    }
}

impl SimulationConfig {
    /// Convert to the simulator's configuration.
    #[must_use]
    pub const fn to_simulated_config(&self) -> SimulatedVenueConfig {
        SimulatedVenueConfig {
            quote_latency: (
                Duration::from_millis(self.quote_latency_min_ms),
                Duration::from_millis(self.quote_latency_max_ms),
            ),
            swap_latency: (
                Duration::from_millis(self.swap_latency_min_ms),
                Duration::from_millis(self.swap_latency_max_ms),
            ),
        }
    }
}

fn default_enabled() -> Vec<Venue> {
    Venue::ALL.to_vec()
}

const fn default_quote_timeout_ms() -> u64 {
    5000
}

const fn default_swap_timeout_ms() -> u64 {
    15_000
}

const fn default_quote_latency_min_ms() -> u64 {
    200
}

const fn default_quote_latency_max_ms() -> u64 {
    400
}

const fn default_swap_latency_min_ms() -> u64 {
    2000
}

const fn default_swap_latency_max_ms() -> u64 {
    3000
}
