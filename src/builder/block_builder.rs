// Block builder

use crate::config::ConsensusParams;
use crate::consensus::constants::BLOCK_VERSION;
use crate::core::{Block, BlockHeader, Hash256, MerkleTxs, Script, Tx, TxOut};
use crate::error::Result;

/// Builds a block around its mint transaction
///
/// The header's merkle root tracks the transaction list; the nonce is left
/// for the proof-of-work search.
#[derive(Debug, Clone)]
pub struct BlockBuilder {
    header: BlockHeader,
    txs: Vec<Tx>,
}

impl BlockBuilder {
    /// First block of a chain
    pub fn genesis(timestamp: u64, target: Hash256, output_script: Script, amount: u64) -> Result<Self> {
        let header = BlockHeader::new(
            BLOCK_VERSION,
            Hash256::zero(),
            Hash256::zero(),
            timestamp,
            target,
            Hash256::zero(),
            0,
        );
        Self::with_mint(header, output_script, amount)
    }

    /// Block following `prev`, retargeting on adjustment boundaries
    pub fn child(
        prev: &BlockHeader,
        prev_adjustment: Option<&BlockHeader>,
        timestamp: u64,
        params: &ConsensusParams,
        output_script: Script,
        amount: u64,
    ) -> Result<Self> {
        let header = BlockHeader::from_prev(prev, prev_adjustment, timestamp, params)?;
        Self::with_mint(header, output_script, amount)
    }

    fn with_mint(header: BlockHeader, output_script: Script, amount: u64) -> Result<Self> {
        let mint = Tx::mint(
            Script::mint_input(header.index, &[])?,
            vec![],
            vec![TxOut::new(amount, output_script)],
            0,
        );
        let mut builder = Self {
            header,
            txs: vec![mint],
        };
        builder.update_merkle_root();
        Ok(builder)
    }

    pub fn add_tx(&mut self, tx: Tx) -> &mut Self {
        self.txs.push(tx);
        self.update_merkle_root();
        self
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn txs(&self) -> &[Tx] {
        &self.txs
    }

    /// Assemble the block with the given header nonce
    pub fn build_with_nonce(&self, nonce: Hash256) -> Block {
        Block::new(self.header.with_nonce(nonce), self.txs.clone())
    }

    pub fn build(&self) -> Block {
        Block::new(self.header.clone(), self.txs.clone())
    }

    fn update_merkle_root(&mut self) {
        self.header.merkle_root = MerkleTxs::from_txs(&self.txs).root();
    }
}
