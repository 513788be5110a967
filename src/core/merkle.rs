// Merkle tree over transaction ids

use crate::core::{double_blake3_hash, Hash256, Tx};

/// Parent of two nodes: double BLAKE3 of `left || right`
pub fn pair_hash(left: &Hash256, right: &Hash256) -> Hash256 {
    let mut combined = [0u8; 64];
    combined[..32].copy_from_slice(left.as_bytes());
    combined[32..].copy_from_slice(right.as_bytes());
    double_blake3_hash(&combined)
}

/// Binary hash tree, every level retained for proofs
///
/// An unpaired node is paired with itself. No leaves gives the zero root and
/// a single leaf is its own root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTxs {
    levels: Vec<Vec<Hash256>>,
}

impl MerkleTxs {
    pub fn new(leaves: Vec<Hash256>) -> Self {
        let mut levels = vec![leaves];
        while let Some(level) = levels.last().filter(|level| level.len() > 1) {
            let next_level = level
                .chunks(2)
                .map(|pair| pair_hash(&pair[0], pair.get(1).unwrap_or(&pair[0])))
                .collect();
            levels.push(next_level);
        }
        Self { levels }
    }

    pub fn from_txs(txs: &[Tx]) -> Self {
        Self::new(txs.iter().map(Tx::id).collect())
    }

    pub fn leaves(&self) -> &[Hash256] {
        &self.levels[0]
    }

    pub fn root(&self) -> Hash256 {
        self.levels
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or_else(Hash256::zero)
    }

    /// Sibling path from leaf `index` up to the root
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.leaves().len() {
            return None;
        }
        let mut siblings = Vec::with_capacity(self.levels.len());
        let mut pos = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = level.get(pos ^ 1).unwrap_or(&level[pos]);
            siblings.push(*sibling);
            pos /= 2;
        }
        Some(MerkleProof {
            leaf_index: index,
            siblings,
        })
    }
}

/// Inclusion proof for one leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    pub leaf_index: usize,
    pub siblings: Vec<Hash256>,
}

impl MerkleProof {
    pub fn verify(&self, leaf: &Hash256, root: &Hash256) -> bool {
        let mut hash = *leaf;
        let mut pos = self.leaf_index;
        for sibling in &self.siblings {
            hash = if pos % 2 == 0 {
                pair_hash(&hash, sibling)
            } else {
                pair_hash(sibling, &hash)
            };
            pos /= 2;
        }
        hash == *root
    }
}
