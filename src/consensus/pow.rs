// Difficulty retargeting

use crate::config::ConsensusParams;
use crate::consensus::constants::BLOCK_VERSION;
use crate::core::{BlockHeader, Hash256};
use crate::error::{Error, Result, VerificationError};
use primitive_types::{U256, U512};

/// Scale the previous target by the observed adjustment period
///
/// `new = prev * clamp(time_diff, interval / 2, interval * 4) / interval`,
/// computed without intermediate overflow. A result that no longer fits in
/// 256 bits is `InsufficientPrecision`.
pub fn new_target(prev_target: &Hash256, time_diff: u64, params: &ConsensusParams) -> Result<Hash256> {
    params.validate()?;
    let interval = params.adjustment_interval();
    let clamped = time_diff.clamp(interval / 2, interval * 4);

    let prev = U256::from_big_endian(prev_target.as_bytes());
    let scaled: U512 = prev.full_mul(U256::from(clamped)) / U512::from(interval);
    let target = U256::try_from(scaled)
        .map_err(|_| Error::InsufficientPrecision("retargeted value exceeds 256 bits".to_string()))?;

    log::debug!(
        "retarget: time_diff={} clamped={} interval={}",
        time_diff,
        clamped,
        interval
    );
    Ok(u256_to_hash(target))
}

fn u256_to_hash(value: U256) -> Hash256 {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    Hash256::new(bytes)
}

impl BlockHeader {
    /// Header following `prev`, with merkle root and nonce zeroed
    ///
    /// On an adjustment index `prev_adjustment` must be the header
    /// `blocks_per_adjustment` blocks back; its timestamp gives the period.
    /// Otherwise the target is copied forward.
    pub fn from_prev(
        prev: &BlockHeader,
        prev_adjustment: Option<&BlockHeader>,
        timestamp: u64,
        params: &ConsensusParams,
    ) -> Result<BlockHeader> {
        params.validate()?;
        let index = prev
            .index
            .checked_add(1)
            .ok_or_else(|| VerificationError::Header("index overflow".to_string()))?;

        let target = if params.is_adjustment_index(index) {
            let adjustment = prev_adjustment.ok_or_else(|| {
                VerificationError::Header(format!("index {} needs the previous adjustment header", index))
            })?;
            if adjustment.index.checked_add(params.blocks_per_adjustment) != Some(index) {
                return Err(VerificationError::Header(format!(
                    "adjustment header index {} does not match period ending at {}",
                    adjustment.index, index
                ))
                .into());
            }
            let time_diff = prev.timestamp.saturating_sub(adjustment.timestamp);
            new_target(&prev.target, time_diff, params)?
        } else {
            prev.target
        };

        Ok(BlockHeader::new(
            BLOCK_VERSION,
            prev.id(),
            Hash256::zero(),
            timestamp,
            target,
            Hash256::zero(),
            index,
        ))
    }

    /// Target this header must carry given its predecessors
    pub fn expected_target(
        &self,
        prev: &BlockHeader,
        prev_adjustment: Option<&BlockHeader>,
        params: &ConsensusParams,
    ) -> Result<Hash256> {
        Ok(BlockHeader::from_prev(prev, prev_adjustment, self.timestamp, params)?.target)
    }
}
