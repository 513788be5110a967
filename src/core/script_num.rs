// Script integers: arbitrary precision, minimal big-endian two's complement

use crate::error::{Error, Result};
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use std::fmt;

/// Signed integer as stored on the script stack
///
/// The sign comes from the high bit of the first byte. The encoding is the
/// shortest two's-complement form, so zero is the single byte `00`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ScriptNum(pub BigInt);

impl ScriptNum {
    pub fn new(value: BigInt) -> Self {
        Self(value)
    }

    /// Decode, rejecting any encoding that is not the canonical one
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let num = Self::from_bytes_unchecked(bytes);
        if num.to_bytes() != bytes {
            return Err(Error::NonMinimalEncoding(format!(
                "script number {}",
                hex::encode(bytes)
            )));
        }
        Ok(num)
    }

    pub fn from_bytes_unchecked(bytes: &[u8]) -> Self {
        Self(BigInt::from_signed_bytes_be(bytes))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_signed_bytes_be()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn to_u32(&self) -> Result<u32> {
        self.0
            .to_u32()
            .ok_or_else(|| Error::InsufficientPrecision(format!("{} does not fit u32", self.0)))
    }

    pub fn to_u64(&self) -> Result<u64> {
        self.0
            .to_u64()
            .ok_or_else(|| Error::InsufficientPrecision(format!("{} does not fit u64", self.0)))
    }

    pub fn to_usize(&self) -> Result<usize> {
        self.0
            .to_usize()
            .ok_or_else(|| Error::InsufficientPrecision(format!("{} does not fit usize", self.0)))
    }
}

impl From<i64> for ScriptNum {
    fn from(value: i64) -> Self {
        Self(BigInt::from(value))
    }
}

impl From<u64> for ScriptNum {
    fn from(value: u64) -> Self {
        Self(BigInt::from(value))
    }
}

impl From<bool> for ScriptNum {
    fn from(value: bool) -> Self {
        Self::from(value as i64)
    }
}

impl fmt::Display for ScriptNum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(n: i64) -> String {
        hex::encode(ScriptNum::from(n).to_bytes())
    }

    #[test]
    fn test_boundary_encodings() {
        assert_eq!(encode(0), "00");
        assert_eq!(encode(1), "01");
        assert_eq!(encode(127), "7f");
        assert_eq!(encode(128), "0080");
        assert_eq!(encode(255), "00ff");
        assert_eq!(encode(256), "0100");
        assert_eq!(encode(-1), "ff");
        assert_eq!(encode(-128), "80");
        assert_eq!(encode(-129), "ff7f");
    }

    #[test]
    fn test_decode_roundtrip() {
        for n in [0i64, 1, 127, 128, -1, -128, -129, 32767, 32768, i64::MAX, i64::MIN] {
            let bytes = ScriptNum::from(n).to_bytes();
            assert_eq!(ScriptNum::from_bytes(&bytes).unwrap(), ScriptNum::from(n));
        }
    }

    #[test]
    fn test_rejects_non_minimal() {
        assert!(matches!(
            ScriptNum::from_bytes(&[0x00, 0x7f]),
            Err(Error::NonMinimalEncoding(_))
        ));
        assert!(matches!(
            ScriptNum::from_bytes(&[0xff, 0xff]),
            Err(Error::NonMinimalEncoding(_))
        ));
        assert!(ScriptNum::from_bytes(&[]).is_err());
    }

    #[test]
    fn test_beyond_i64() {
        let bytes = [0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let num = ScriptNum::from_bytes(&bytes).unwrap();
        assert_eq!(num.to_bytes(), bytes);
        assert!(matches!(num.to_u64(), Err(Error::InsufficientPrecision(_))));
    }

    #[test]
    fn test_to_u32_negative() {
        assert!(ScriptNum::from(-5i64).to_u32().is_err());
        assert_eq!(ScriptNum::from(5i64).to_u32().unwrap(), 5);
    }
}
