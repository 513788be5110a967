// Script representation: chunk list with binary and text forms

use crate::core::opcode::{opcode_name, OpCode};
use crate::core::{ByteReader, ByteWriter, Hash256, ScriptNum, Serializable};
use crate::error::{Error, Result};
use num_bigint::BigInt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One opcode, plus its payload for push opcodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptChunk {
    opcode: u8,
    data: Option<Vec<u8>>,
}

impl ScriptChunk {
    /// Checked constructor: payload must agree with the opcode
    pub fn new(opcode: u8, data: Option<Vec<u8>>) -> Result<Self> {
        match (&data, OpCode::is_push_data(opcode)) {
            (Some(payload), true) => check_push_len(opcode, payload.len())?,
            (None, false) => {}
            (None, true) => {
                return Err(Error::InvalidEncoding(format!(
                    "{} requires a payload",
                    opcode_name(opcode)
                )))
            }
            (Some(_), false) => {
                return Err(Error::InvalidEncoding(format!(
                    "{} cannot carry a payload",
                    opcode_name(opcode)
                )))
            }
        }
        Ok(Self { opcode, data })
    }

    pub fn from_opcode(op: OpCode) -> Self {
        Self {
            opcode: op as u8,
            data: None,
        }
    }

    /// Push chunk using the smallest PUSHDATA variant for the payload length
    pub fn from_data(data: Vec<u8>) -> Result<Self> {
        let opcode = match data.len() {
            0..=0xff => OpCode::PushData1,
            0x100..=0xffff => OpCode::PushData2,
            len if u32::try_from(len).is_ok() => OpCode::PushData4,
            len => return Err(Error::InvalidSize(format!("push of {} bytes", len))),
        };
        Ok(Self {
            opcode: opcode as u8,
            data: Some(data),
        })
    }

    /// Small integers use `0`/`1`..`16`/`1NEGATE`, anything else is a data push
    pub fn from_num(num: &ScriptNum) -> Result<Self> {
        if num.0 == BigInt::from(-1) {
            return Ok(Self::from_opcode(OpCode::Op1Negate));
        }
        match num.to_u32() {
            Ok(n) if n <= 16 => Ok(Self::from_opcode(OpCode::from_small_int(n as u8)?)),
            _ => Self::from_data(num.to_bytes()),
        }
    }

    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub fn op(&self) -> Option<OpCode> {
        OpCode::from_byte(self.opcode)
    }

    pub fn is_push(&self) -> bool {
        self.data.is_some()
    }

    pub fn to_text(&self) -> String {
        match &self.data {
            Some(data) => format!("0x{}", hex::encode(data)),
            None => opcode_name(self.opcode),
        }
    }

    pub fn from_text(token: &str) -> Result<Self> {
        if let Some(hex_str) = token.strip_prefix("0x") {
            return Self::from_data(hex::decode(hex_str)?);
        }
        let op = OpCode::from_name(token)
            .ok_or_else(|| Error::InvalidOpcode(format!("unknown opcode name {:?}", token)))?;
        if OpCode::is_push_data(op as u8) {
            return Err(Error::InvalidEncoding(format!(
                "{} must be written as a 0x literal",
                token
            )));
        }
        Ok(Self::from_opcode(op))
    }
}

fn check_push_len(opcode: u8, len: usize) -> Result<()> {
    let ok = match OpCode::from_byte(opcode) {
        None => len == opcode as usize,
        Some(OpCode::PushData1) => len <= 0xff,
        Some(OpCode::PushData2) => {
            if len <= 0xff {
                return Err(Error::NonMinimalEncoding(format!("PUSHDATA2 of {} bytes", len)));
            }
            len <= 0xffff
        }
        Some(OpCode::PushData4) => {
            if len <= 0xffff {
                return Err(Error::NonMinimalEncoding(format!("PUSHDATA4 of {} bytes", len)));
            }
            u32::try_from(len).is_ok()
        }
        Some(_) => false,
    };
    if !ok {
        return Err(Error::InvalidSize(format!(
            "{} with {} byte payload",
            opcode_name(opcode),
            len
        )));
    }
    Ok(())
}

impl Serializable for ScriptChunk {
    fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u8(self.opcode);
        let Some(data) = &self.data else { return };
        match OpCode::from_byte(self.opcode) {
            Some(OpCode::PushData1) => writer.write_u8(data.len() as u8),
            Some(OpCode::PushData2) => writer.write_u16_be(data.len() as u16),
            Some(OpCode::PushData4) => writer.write_u32_be(data.len() as u32),
            _ => {}
        }
        writer.write_bytes(data);
    }

    fn read_from(reader: &mut ByteReader) -> Result<Self> {
        let opcode = reader.read_u8()?;
        let len = match OpCode::from_byte(opcode) {
            _ if OpCode::is_direct_push(opcode) => opcode as usize,
            Some(OpCode::PushData1) => reader.read_u8()? as usize,
            Some(OpCode::PushData2) => reader.read_u16_be()? as usize,
            Some(OpCode::PushData4) => reader.read_u32_be()? as usize,
            _ => return Ok(Self { opcode, data: None }),
        };
        if len > reader.remaining() {
            return Err(Error::InvalidSize(format!(
                "{} declares {} bytes, {} remaining",
                opcode_name(opcode),
                len,
                reader.remaining()
            )));
        }
        let data = reader.read_bytes(len)?.to_vec();
        Self::new(opcode, Some(data))
    }
}

/// Ordered sequence of chunks
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Script {
    pub chunks: Vec<ScriptChunk>,
}

impl Script {
    pub fn new(chunks: Vec<ScriptChunk>) -> Self {
        Self { chunks }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_wire()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_wire(data)
    }

    pub fn to_text(&self) -> String {
        self.chunks
            .iter()
            .map(ScriptChunk::to_text)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn from_text(text: &str) -> Result<Self> {
        let chunks = text
            .split_whitespace()
            .map(ScriptChunk::from_text)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { chunks })
    }

    pub fn is_push_only(&self) -> bool {
        self.chunks.iter().all(|chunk| {
            chunk.is_push()
                || matches!(chunk.op(), Some(op) if op == OpCode::Op0 || op == OpCode::Op1Negate || op.small_int().is_some())
        })
    }

    /// Create a pay-to-pubkey-hash output script
    /// DUP DOUBLEBLAKE3 <pkh> EQUALVERIFY CHECKSIG
    pub fn pkh_output(pkh: &Hash256) -> Self {
        Self::new(vec![
            ScriptChunk::from_opcode(OpCode::Dup),
            ScriptChunk::from_opcode(OpCode::DoubleBlake3),
            push_hash(pkh),
            ScriptChunk::from_opcode(OpCode::EqualVerify),
            ScriptChunk::from_opcode(OpCode::CheckSig),
        ])
    }

    /// Create a pay-to-pubkey-hash input script
    /// <signature> <pubkey>
    pub fn pkh_input(sig: &[u8], pubkey: &[u8]) -> Result<Self> {
        Ok(Self::new(vec![
            ScriptChunk::from_data(sig.to_vec())?,
            ScriptChunk::from_data(pubkey.to_vec())?,
        ]))
    }

    /// Pay-to-pubkey-hash that anyone may spend once `lock_rel` has passed
    /// DUP DOUBLEBLAKE3 <pkh> EQUAL IF CHECKSIG ELSE <lock_rel> CHECKLOCKRELVERIFY DROP 1 ENDIF
    pub fn pkhx_output(pkh: &Hash256, lock_rel: u32) -> Result<Self> {
        Ok(Self::new(vec![
            ScriptChunk::from_opcode(OpCode::Dup),
            ScriptChunk::from_opcode(OpCode::DoubleBlake3),
            push_hash(pkh),
            ScriptChunk::from_opcode(OpCode::Equal),
            ScriptChunk::from_opcode(OpCode::If),
            ScriptChunk::from_opcode(OpCode::CheckSig),
            ScriptChunk::from_opcode(OpCode::Else),
            ScriptChunk::from_num(&ScriptNum::from(lock_rel as u64))?,
            ScriptChunk::from_opcode(OpCode::CheckLockRelVerify),
            ScriptChunk::from_opcode(OpCode::Drop),
            ScriptChunk::from_opcode(OpCode::Op1),
            ScriptChunk::from_opcode(OpCode::EndIf),
        ]))
    }

    /// Input script for spending an expired output: a single `0`
    pub fn expired_input() -> Self {
        Self::new(vec![ScriptChunk::from_opcode(OpCode::Op0)])
    }

    /// Mint input script: the block index, then optional extra data
    pub fn mint_input(block_index: u64, extra: &[u8]) -> Result<Self> {
        let mut chunks = vec![ScriptChunk::from_num(&ScriptNum::from(block_index))?];
        if !extra.is_empty() {
            chunks.push(ScriptChunk::from_data(extra.to_vec())?);
        }
        Ok(Self::new(chunks))
    }

    /// First chunk pushes `block_index` in minimal form
    pub fn starts_with_block_index(&self, block_index: u64) -> bool {
        match ScriptChunk::from_num(&ScriptNum::from(block_index)) {
            Ok(expected) => self.chunks.first() == Some(&expected),
            Err(_) => false,
        }
    }

    pub fn is_pkh_output(&self) -> bool {
        self.pkh_output_hash().is_some()
    }

    /// The 32-byte hash committed to by a PKH output
    pub fn pkh_output_hash(&self) -> Option<Hash256> {
        match self.chunks.as_slice() {
            [dup, hash, pkh, eqv, checksig]
                if dup.op() == Some(OpCode::Dup)
                    && hash.op() == Some(OpCode::DoubleBlake3)
                    && eqv.op() == Some(OpCode::EqualVerify)
                    && checksig.op() == Some(OpCode::CheckSig) =>
            {
                pkh.data.as_deref().and_then(|d| Hash256::from_slice(d).ok())
            }
            _ => None,
        }
    }

    /// The hash and relative lock committed to by an expirable PKH output
    pub fn pkhx_output_parts(&self) -> Option<(Hash256, u32)> {
        match self.chunks.as_slice() {
            [dup, hash, pkh, equal, if_, checksig, else_, lock, clrv, drop, one, endif]
                if dup.op() == Some(OpCode::Dup)
                    && hash.op() == Some(OpCode::DoubleBlake3)
                    && equal.op() == Some(OpCode::Equal)
                    && if_.op() == Some(OpCode::If)
                    && checksig.op() == Some(OpCode::CheckSig)
                    && else_.op() == Some(OpCode::Else)
                    && clrv.op() == Some(OpCode::CheckLockRelVerify)
                    && drop.op() == Some(OpCode::Drop)
                    && one.op() == Some(OpCode::Op1)
                    && endif.op() == Some(OpCode::EndIf) =>
            {
                let pkh = pkh.data.as_deref().and_then(|d| Hash256::from_slice(d).ok())?;
                let lock_rel = match (&lock.data, lock.op().and_then(OpCode::small_int)) {
                    (Some(data), _) => ScriptNum::from_bytes(data).ok()?.to_u32().ok()?,
                    (None, Some(n)) => n as u32,
                    (None, None) if lock.op() == Some(OpCode::Op0) => 0,
                    _ => return None,
                };
                Some((pkh, lock_rel))
            }
            _ => None,
        }
    }

    pub fn is_pkhx_output(&self) -> bool {
        self.pkhx_output_parts().is_some()
    }

    /// Key hash that must sign to spend this output, for PKH and expirable PKH
    pub fn signing_pubkey_hash(&self) -> Option<Hash256> {
        self.pkh_output_hash()
            .or_else(|| self.pkhx_output_parts().map(|(pkh, _)| pkh))
    }

    pub fn is_pkh_input(&self) -> bool {
        matches!(self.chunks.as_slice(), [sig, pubkey] if sig.is_push() && pubkey.is_push())
    }

    pub fn is_expired_input(&self) -> bool {
        matches!(self.chunks.as_slice(), [chunk] if chunk.op() == Some(OpCode::Op0))
    }
}

fn push_hash(hash: &Hash256) -> ScriptChunk {
    ScriptChunk {
        opcode: OpCode::PushData1 as u8,
        data: Some(hash.as_bytes().to_vec()),
    }
}

impl Serializable for Script {
    fn write_to(&self, writer: &mut ByteWriter) {
        for chunk in &self.chunks {
            chunk.write_to(writer);
        }
    }

    /// Consumes the rest of the reader
    fn read_from(reader: &mut ByteReader) -> Result<Self> {
        let mut chunks = Vec::new();
        while !reader.is_empty() {
            chunks.push(ScriptChunk::read_from(reader)?);
        }
        Ok(Self { chunks })
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl FromStr for Script {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_text(s)
    }
}

/// Hex of the wire bytes; the text form does not keep the push opcode
impl Serialize for Script {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for Script {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pkh_output_creation() {
        let pkh = Hash256::new([0x12; 32]);
        let script = Script::pkh_output(&pkh);
        let bytes = script.to_bytes();

        assert_eq!(bytes.len(), 38);
        assert_eq!(bytes[0], OpCode::Dup as u8);
        assert_eq!(bytes[1], OpCode::DoubleBlake3 as u8);
        assert_eq!(bytes[2], OpCode::PushData1 as u8);
        assert_eq!(bytes[3], 32);
        assert_eq!(&bytes[4..36], pkh.as_bytes());
        assert_eq!(bytes[36], OpCode::EqualVerify as u8);
        assert_eq!(bytes[37], OpCode::CheckSig as u8);
        assert!(script.is_pkh_output());
        assert_eq!(script.pkh_output_hash(), Some(pkh));
    }

    #[test]
    fn test_text_roundtrip() {
        let text = format!("DUP DOUBLEBLAKE3 0x{} EQUALVERIFY CHECKSIG", "ab".repeat(32));
        let script = Script::from_text(&text).unwrap();
        assert_eq!(script.to_text(), text);
        assert_eq!(Script::from_bytes(&script.to_bytes()).unwrap(), script);
    }

    #[test]
    fn test_text_selects_minimal_pushdata() {
        let one = Script::from_text("0xff").unwrap();
        assert_eq!(one.to_bytes(), vec![0x4c, 0x01, 0xff]);

        let big = Script::from_text(&format!("0x{}", "00".repeat(256))).unwrap();
        assert_eq!(big.chunks[0].opcode(), OpCode::PushData2 as u8);
        assert_eq!(&big.to_bytes()[..3], &[0x4d, 0x01, 0x00]);

        let huge = Script::from_text(&format!("0x{}", "00".repeat(0x1_0000))).unwrap();
        assert_eq!(huge.chunks[0].opcode(), OpCode::PushData4 as u8);
    }

    #[test]
    fn test_direct_push_decoding() {
        let script = Script::from_bytes(&[0x02, 0xaa, 0xbb, 0x76]).unwrap();
        assert_eq!(script.chunks.len(), 2);
        assert_eq!(script.chunks[0].data(), Some(&[0xaa, 0xbb][..]));
        assert_eq!(script.chunks[0].opcode(), 0x02);
        assert_eq!(script.to_text(), "0xaabb DUP");
        assert_eq!(script.to_bytes(), vec![0x02, 0xaa, 0xbb, 0x76]);
    }

    #[test]
    fn test_declared_length_too_large() {
        assert!(matches!(
            Script::from_bytes(&[0x4c, 0x05, 0x01]),
            Err(Error::InvalidSize(_))
        ));
        assert!(matches!(Script::from_bytes(&[0x03, 0x01]), Err(Error::InvalidSize(_))));
        assert!(matches!(
            Script::from_bytes(&[0x4d, 0x01]),
            Err(Error::NotEnoughData { .. })
        ));
    }

    #[test]
    fn test_non_minimal_pushdata_rejected() {
        assert!(matches!(
            Script::from_bytes(&[0x4d, 0x00, 0x02, 0xaa, 0xbb]),
            Err(Error::NonMinimalEncoding(_))
        ));
        assert!(Script::from_bytes(&[0x4c, 0x02, 0xaa, 0xbb]).is_ok());
    }

    #[test]
    fn test_invalid_text() {
        assert!(matches!(Script::from_text("NOPE"), Err(Error::InvalidOpcode(_))));
        assert!(matches!(Script::from_text("0xzz"), Err(Error::InvalidHex(_))));
        assert!(matches!(
            Script::from_text("PUSHDATA1"),
            Err(Error::InvalidEncoding(_))
        ));
        assert!(Script::from_text("").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_opcode_byte_parses() {
        let script = Script::from_bytes(&[0xb0]).unwrap();
        assert_eq!(script.chunks[0].op(), None);
    }

    #[test]
    fn test_chunk_constructor_checks_payload() {
        assert!(ScriptChunk::new(OpCode::Dup as u8, Some(vec![1])).is_err());
        assert!(ScriptChunk::new(OpCode::PushData1 as u8, None).is_err());
        assert!(ScriptChunk::new(0x02, Some(vec![1])).is_err());
        assert!(ScriptChunk::new(0x02, Some(vec![1, 2])).is_ok());
    }

    #[test]
    fn test_from_num() {
        assert_eq!(ScriptChunk::from_num(&ScriptNum::from(0i64)).unwrap().to_text(), "0");
        assert_eq!(ScriptChunk::from_num(&ScriptNum::from(16i64)).unwrap().to_text(), "16");
        assert_eq!(ScriptChunk::from_num(&ScriptNum::from(-1i64)).unwrap().to_text(), "1NEGATE");
        assert_eq!(ScriptChunk::from_num(&ScriptNum::from(17i64)).unwrap().to_text(), "0x11");
        assert_eq!(ScriptChunk::from_num(&ScriptNum::from(-5i64)).unwrap().to_text(), "0xfb");
    }

    #[test]
    fn test_templates() {
        let pkh = Hash256::new([7; 32]);
        assert!(Script::expired_input().is_expired_input());
        assert!(Script::pkh_input(&[1; 65], &[2; 33]).unwrap().is_pkh_input());
        assert!(Script::pkh_input(&[1; 65], &[2; 33]).unwrap().is_push_only());
        assert!(!Script::pkh_output(&pkh).is_push_only());
        let pkhx = Script::pkhx_output(&pkh, 1000).unwrap();
        assert!(!pkhx.is_pkh_output());
        assert_eq!(pkhx.pkhx_output_parts(), Some((pkh, 1000)));
        assert_eq!(Script::pkhx_output(&pkh, 5).unwrap().pkhx_output_parts(), Some((pkh, 5)));
        assert_eq!(Script::pkh_output(&pkh).signing_pubkey_hash(), Some(pkh));
        assert_eq!(pkhx.signing_pubkey_hash(), Some(pkh));
        assert!(!Script::pkh_output(&pkh).is_pkhx_output());
        assert_eq!(Script::from_bytes(&pkhx.to_bytes()).unwrap(), pkhx);
    }

    #[test]
    fn test_long_push_roundtrips() {
        let sig = vec![0xab; 300];
        let script = Script::pkh_input(&sig, &[2; 33]).unwrap();
        assert_eq!(script.chunks[0].opcode(), OpCode::PushData2 as u8);
        let bytes = script.to_bytes();
        assert_eq!(&bytes[..3], &[0x4d, 0x01, 0x2c]);
        let back = Script::from_bytes(&bytes).unwrap();
        assert_eq!(back, script);
        assert_eq!(back.chunks[0].data(), Some(&sig[..]));
    }

    #[test]
    fn test_json_keeps_direct_push() {
        let script = Script::from_bytes(&[0x02, 0xaa, 0xbb]).unwrap();
        let json = serde_json::to_string(&script).unwrap();
        assert_eq!(json, "\"02aabb\"");
        let back: Script = serde_json::from_str(&json).unwrap();
        assert_eq!(back, script);
        assert_eq!(back.to_bytes(), vec![0x02, 0xaa, 0xbb]);
        assert!(serde_json::from_str::<Script>("\"4c05\"").is_err());
    }

    #[test]
    fn test_mint_input_index() {
        let script = Script::mint_input(2016, b"extra").unwrap();
        assert_eq!(script.chunks.len(), 2);
        assert!(script.starts_with_block_index(2016));
        assert!(!script.starts_with_block_index(2017));
        assert!(script.is_push_only());

        let small = Script::mint_input(3, &[]).unwrap();
        assert_eq!(small.to_text(), "3");
        assert!(small.starts_with_block_index(3));
    }
}
