//! Engine configuration.
//!
//! Only presentation-facing sizes live here. The analysis thresholds are
//! fixed constants in their modules.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Sizes that shape the per-session state of the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of log-spaced bands in the pseudo-spectrum (default: 48)
    pub band_count: usize,

    /// Number of recent cents-deviation samples kept (default: 128)
    pub cents_history: usize,

    /// Number of recent band vectors kept for visualization aging (default: 32)
    pub band_history: usize,

    /// Number of recent (level, peak) pairs kept (default: 128)
    pub level_history: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            band_count: 48,
            cents_history: 128,
            band_history: 32,
            level_history: 128,
        }
    }
}

impl EngineConfig {
    /// Checks that the configuration can drive a session.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.band_count < 2 {
            return Err(EngineError::InvalidConfig(format!(
                "band_count must be at least 2, got {}",
                self.band_count
            )));
        }
        if self.cents_history == 0 || self.band_history == 0 || self.level_history == 0 {
            return Err(EngineError::InvalidConfig(
                "history capacities must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
