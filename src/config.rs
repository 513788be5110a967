// Consensus parameters

use crate::consensus::constants::{
    BLOCKS_PER_ADJUSTMENT, BLOCK_INTERVAL_SECONDS, MAX_SCRIPT_OPS,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunable consensus parameters
///
/// `Default` gives the network values. A JSON file may override any subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusParams {
    /// Blocks between difficulty adjustments
    pub blocks_per_adjustment: u64,
    /// Intended seconds between blocks
    pub block_interval_seconds: u64,
    /// Ceiling on executed non-push opcodes per script
    pub max_script_ops: usize,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            blocks_per_adjustment: BLOCKS_PER_ADJUSTMENT,
            block_interval_seconds: BLOCK_INTERVAL_SECONDS,
            max_script_ops: MAX_SCRIPT_OPS,
        }
    }
}

impl ConsensusParams {
    /// Expected seconds for one adjustment period
    pub fn adjustment_interval(&self) -> u64 {
        self.blocks_per_adjustment
            .saturating_mul(self.block_interval_seconds)
    }

    pub fn is_adjustment_index(&self, index: u64) -> bool {
        index > 0 && index.checked_rem(self.blocks_per_adjustment) == Some(0)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("failed to parse params: {}", e)))?;
        params.validate()?;
        Ok(params)
    }

    /// Load parameters from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.as_ref().display(), e))
        })?;
        log::info!("Loaded consensus params from {}", path.as_ref().display());
        Self::from_json(&json)
    }

    /// Reject zero periods and intervals that overflow when clamped
    pub fn validate(&self) -> Result<()> {
        if self.blocks_per_adjustment == 0 || self.block_interval_seconds == 0 {
            return Err(Error::Config(
                "blocks_per_adjustment and block_interval_seconds must be positive".to_string(),
            ));
        }
        if self
            .blocks_per_adjustment
            .checked_mul(self.block_interval_seconds)
            .and_then(|interval| interval.checked_mul(4))
            .is_none()
        {
            return Err(Error::Config("adjustment interval overflows".to_string()));
        }
        Ok(())
    }
}
