//! Per-market configuration
//!
//! Every field has a default, so a JSON document only needs to name what it
//! changes:
//!
//! ```json
//! { "output_mode": "replay", "max_pending_deltas": 2000 }
//! ```

use serde::{Deserialize, Serialize};

use crate::dispatch::OutputMode;
use crate::error::SyncError;

/// Configuration for a `Market`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Live delivery or ordered replay queue for fills.
    pub output_mode: OutputMode,
    /// Deltas buffered before the first snapshot before giving up.
    pub max_pending_deltas: usize,
    /// Levels per side covered by `Market::depth_view` checksums.
    pub checksum_depth: usize,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            output_mode: OutputMode::Live,
            max_pending_deltas: 10_000,
            checksum_depth: 25,
        }
    }
}

impl MarketConfig {
    pub fn with_output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = mode;
        self
    }

    pub fn with_max_pending_deltas(mut self, max: usize) -> Self {
        self.max_pending_deltas = max;
        self
    }

    pub fn with_checksum_depth(mut self, depth: usize) -> Self {
        self.checksum_depth = depth;
        self
    }

    /// Parse from a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        Ok(serde_json::from_str(json)?)
    }
}
