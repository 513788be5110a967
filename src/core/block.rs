// Block data structures

use crate::core::{
    blake3_hash, double_blake3_hash, ByteReader, ByteWriter, Hash256, MerkleTxs, Serializable, Tx,
};
use crate::error::Result;
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Block header - 148 bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block version
    pub version: u32,
    /// Id of the previous block
    pub prev_block_id: Hash256,
    /// Merkle root of all transactions in the block
    pub merkle_root: Hash256,
    /// Block timestamp (Unix seconds)
    pub timestamp: u64,
    /// Proof-of-work threshold, 256-bit big-endian
    pub target: Hash256,
    /// Filled in by the proof-of-work search
    pub nonce: Hash256,
    /// Height in the chain, genesis is 0
    pub index: u64,
}

impl BlockHeader {
    pub const SIZE: usize = 4 + 32 + 32 + 8 + 32 + 32 + 8;

    pub fn new(
        version: u32,
        prev_block_id: Hash256,
        merkle_root: Hash256,
        timestamp: u64,
        target: Hash256,
        nonce: Hash256,
        index: u64,
    ) -> Self {
        Self {
            version,
            prev_block_id,
            merkle_root,
            timestamp,
            target,
            nonce,
            index,
        }
    }

    /// Single BLAKE3 of the header, compared against the target
    pub fn hash(&self) -> Hash256 {
        blake3_hash(&self.to_wire())
    }

    /// Block id: double BLAKE3 of the header
    pub fn id(&self) -> Hash256 {
        double_blake3_hash(&self.to_wire())
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.prev_block_id.is_zero()
    }

    /// Check if the header hash is numerically below the target
    pub fn is_target_valid(&self) -> bool {
        U256::from_big_endian(self.hash().as_bytes()) < U256::from_big_endian(self.target.as_bytes())
    }

    /// Copy with a different nonce
    pub fn with_nonce(&self, nonce: Hash256) -> Self {
        Self {
            nonce,
            ..self.clone()
        }
    }

    /// Copy with a different merkle root
    pub fn with_merkle_root(&self, merkle_root: Hash256) -> Self {
        Self {
            merkle_root,
            ..self.clone()
        }
    }
}

impl Serializable for BlockHeader {
    fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u32_be(self.version);
        writer.write_bytes(self.prev_block_id.as_bytes());
        writer.write_bytes(self.merkle_root.as_bytes());
        writer.write_u64_be(self.timestamp);
        writer.write_bytes(self.target.as_bytes());
        writer.write_bytes(self.nonce.as_bytes());
        writer.write_u64_be(self.index);
    }

    fn read_from(reader: &mut ByteReader) -> Result<Self> {
        Ok(Self {
            version: reader.read_u32_be()?,
            prev_block_id: Hash256::new(reader.read_fixed()?),
            merkle_root: Hash256::new(reader.read_fixed()?),
            timestamp: reader.read_u64_be()?,
            target: Hash256::new(reader.read_fixed()?),
            nonce: Hash256::new(reader.read_fixed()?),
            index: reader.read_u64_be()?,
        })
    }
}

/// Block - header and transactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub txs: Vec<Tx>,
}

impl Block {
    pub fn new(header: BlockHeader, txs: Vec<Tx>) -> Self {
        Self { header, txs }
    }

    pub fn merkle_root(&self) -> Hash256 {
        MerkleTxs::from_txs(&self.txs).root()
    }

    pub fn is_valid_merkle_root(&self) -> bool {
        self.merkle_root() == self.header.merkle_root
    }

    pub fn id(&self) -> Hash256 {
        self.header.id()
    }

    pub fn is_genesis(&self) -> bool {
        self.header.is_genesis()
    }
}

impl Serializable for Block {
    fn write_to(&self, writer: &mut ByteWriter) {
        self.header.write_to(writer);
        writer.write_var_int(self.txs.len() as u64);
        for tx in &self.txs {
            tx.write_to(writer);
        }
    }

    fn read_from(reader: &mut ByteReader) -> Result<Self> {
        let header = BlockHeader::read_from(reader)?;
        let tx_count = reader.read_var_len()?;
        let mut txs = Vec::with_capacity(tx_count.min(reader.remaining()));
        for _ in 0..tx_count {
            txs.push(Tx::read_from(reader)?);
        }
        Ok(Self { header, txs })
    }
}
