// Hashing utilities

use crate::core::Hash256;

/// Single BLAKE3 hash
pub fn blake3_hash(data: &[u8]) -> Hash256 {
    Hash256::new(*blake3::hash(data).as_bytes())
}

/// BLAKE3 double hash
/// double_blake3 = BLAKE3(BLAKE3(data))
pub fn double_blake3_hash(data: &[u8]) -> Hash256 {
    let first_hash = blake3::hash(data);
    blake3_hash(first_hash.as_bytes())
}

/// Public key hash used by pay-to-pubkey-hash scripts
pub fn pubkey_hash(pubkey: &[u8]) -> Hash256 {
    double_blake3_hash(pubkey)
}
