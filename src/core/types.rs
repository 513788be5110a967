// Fixed-width byte buffers

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Owned byte buffer of static length N
///
/// Used for hashes (32), compressed public keys (33), targets and nonces (32).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixedBuf<const N: usize>(pub [u8; N]);

/// 256-bit hash (transaction ids, block ids, merkle roots)
pub type Hash256 = FixedBuf<32>;

/// Compressed secp256k1 public key
pub type PubKeyBuf = FixedBuf<33>;

impl<const N: usize> FixedBuf<N> {
    pub const SIZE: usize = N;

    pub fn new(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    /// Copy from a slice of exactly N bytes
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; N] = slice.try_into().map_err(|_| {
            Error::InvalidSize(format!("expected {} bytes, got {}", N, slice.len()))
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }

    pub fn zero() -> Self {
        Self([0u8; N])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Lowercase hex, natural byte order
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)?;
        Self::from_slice(&bytes)
    }
}

impl<const N: usize> Default for FixedBuf<N> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<const N: usize> AsRef<[u8]> for FixedBuf<N> {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl<const N: usize> From<[u8; N]> for FixedBuf<N> {
    fn from(bytes: [u8; N]) -> Self {
        Self(bytes)
    }
}

impl<const N: usize> fmt::Display for FixedBuf<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl<const N: usize> fmt::Debug for FixedBuf<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FixedBuf<{}>({})", N, self.to_hex())
    }
}

impl<const N: usize> Serialize for FixedBuf<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de, const N: usize> Deserialize<'de> for FixedBuf<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
