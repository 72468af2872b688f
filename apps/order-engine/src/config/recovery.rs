//! Recovery configuration for re-queuing unfinished orders on startup.

use serde::{Deserialize, Serialize};

/// Recovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Re-queue non-terminal orders from the store on startup.
    #[serde(default = "default_recovery_enabled")]
    pub enabled: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            enabled: default_recovery_enabled(),
        }
    }
}

const fn default_recovery_enabled() -> bool {
    true
}
