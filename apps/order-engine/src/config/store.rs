//! Order store configuration.

use serde::{Deserialize, Serialize};

/// Which order store to run with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process memory; lost on restart.
    #[default]
    Memory,
    /// One JSON file per order under `path`.
    File,
}

/// Order store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend.
    #[serde(default)]
    pub backend: StoreBackend,
    /// Directory for the file backend.
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> String {
    "data/orders".to_string()
}
