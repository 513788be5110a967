// Binary codec: cursor reader, chunk writer and VarInt

use crate::error::{Error, Result};

/// Types with a canonical binary encoding
pub trait Serializable: Sized {
    fn write_to(&self, writer: &mut ByteWriter);
    fn read_from(reader: &mut ByteReader) -> Result<Self>;

    fn to_wire(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.write_to(&mut writer);
        writer.into_bytes()
    }

    /// Decode a value that must occupy the whole buffer
    fn from_wire(data: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let value = Self::read_from(&mut reader)?;
        reader.finish()?;
        Ok(value)
    }

    fn to_hex(&self) -> String {
        hex::encode(self.to_wire())
    }

    fn from_hex(hex_str: &str) -> Result<Self> {
        Self::from_wire(&hex::decode(hex_str)?)
    }
}

/// Cursor over a borrowed byte slice
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Fail with `TooMuchData` if anything is left unread
    pub fn finish(&self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(Error::TooMuchData(n)),
        }
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::NotEnoughData {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_fixed::<1>()?[0])
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_fixed()?))
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_fixed()?))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_fixed()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_fixed()?))
    }

    pub fn read_u64_be(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.read_fixed()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_fixed()?))
    }

    /// Read a variable-length integer (VarInt), rejecting non-minimal forms
    pub fn read_var_int(&mut self) -> Result<u64> {
        let first = self.read_u8()?;
        let (value, min) = match first {
            0..=0xfc => return Ok(first as u64),
            0xfd => (self.read_u16_be()? as u64, 0xfd),
            0xfe => (self.read_u32_be()? as u64, 0x1_0000),
            0xff => (self.read_u64_be()?, 0x1_0000_0000),
        };
        if value < min {
            return Err(Error::NonMinimalEncoding(format!(
                "varint {} encoded with marker {:#04x}",
                value, first
            )));
        }
        Ok(value)
    }

    /// VarInt that must fit a `usize` length
    pub fn read_var_len(&mut self) -> Result<usize> {
        let len = self.read_var_int()?;
        usize::try_from(len)
            .map_err(|_| Error::InsufficientPrecision(format!("length {} exceeds usize", len)))
    }

    /// Read bytes with length prefix (VarInt length + data)
    pub fn read_var_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_var_len()?;
        if len > self.remaining() {
            return Err(Error::InvalidSize(format!(
                "declared length {} exceeds remaining {}",
                len,
                self.remaining()
            )));
        }
        self.read_bytes(len)
    }
}

/// Append-only byte accumulator mirroring `ByteReader`
#[derive(Debug, Clone, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16_be(&mut self, value: u16) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_u16_le(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u32_be(&mut self, value: u32) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_u32_le(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u64_be(&mut self, value: u64) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_u64_le(&mut self, value: u64) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Write a variable-length integer in its minimal form
    pub fn write_var_int(&mut self, value: u64) {
        self.write_bytes(&encode_var_int(value));
    }

    /// Write bytes with length prefix (VarInt length + data)
    pub fn write_var_bytes(&mut self, data: &[u8]) {
        self.write_var_int(data.len() as u64);
        self.write_bytes(data);
    }
}

/// Minimal VarInt encoding of `value`
pub fn encode_var_int(value: u64) -> Vec<u8> {
    match value {
        0..=0xfc => vec![value as u8],
        0xfd..=0xffff => {
            let mut out = vec![0xfd];
            out.extend_from_slice(&(value as u16).to_be_bytes());
            out
        }
        0x1_0000..=0xffff_ffff => {
            let mut out = vec![0xfe];
            out.extend_from_slice(&(value as u32).to_be_bytes());
            out
        }
        _ => {
            let mut out = vec![0xff];
            out.extend_from_slice(&value.to_be_bytes());
            out
        }
    }
}

/// Decode a VarInt that must occupy the whole buffer
pub fn decode_var_int(data: &[u8]) -> Result<u64> {
    let mut reader = ByteReader::new(data);
    let value = reader.read_var_int()?;
    reader.finish()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_small() {
        assert_eq!(encode_var_int(100), vec![100]);
        assert_eq!(encode_var_int(0xfc), vec![0xfc]);
        assert_eq!(decode_var_int(&[100]).unwrap(), 100);
    }

    #[test]
    fn test_varint_boundaries_big_endian() {
        assert_eq!(encode_var_int(0xfd), vec![0xfd, 0x00, 0xfd]);
        assert_eq!(encode_var_int(1000), vec![0xfd, 0x03, 0xe8]);
        assert_eq!(encode_var_int(0x1_0000), vec![0xfe, 0x00, 0x01, 0x00, 0x00]);
        assert_eq!(
            encode_var_int(0x1_0000_0000),
            vec![0xff, 0, 0, 0, 1, 0, 0, 0, 0]
        );
        for value in [0xfd, 0xffff, 0x1_0000, 0xffff_ffff, 0x1_0000_0000, u64::MAX] {
            assert_eq!(decode_var_int(&encode_var_int(value)).unwrap(), value);
        }
    }

    #[test]
    fn test_varint_rejects_non_minimal() {
        // 3-byte encoding of zero
        assert!(matches!(
            decode_var_int(&[0xfd, 0x00, 0x00]),
            Err(Error::NonMinimalEncoding(_))
        ));
        assert!(matches!(
            decode_var_int(&[0xfd, 0x00, 0xfc]),
            Err(Error::NonMinimalEncoding(_))
        ));
        assert!(matches!(
            decode_var_int(&[0xfe, 0x00, 0x00, 0xff, 0xff]),
            Err(Error::NonMinimalEncoding(_))
        ));
        assert!(matches!(
            decode_var_int(&[0xff, 0, 0, 0, 0, 0xff, 0xff, 0xff, 0xff]),
            Err(Error::NonMinimalEncoding(_))
        ));
    }

    #[test]
    fn test_varint_truncated() {
        assert!(matches!(
            decode_var_int(&[0xfe, 0x01]),
            Err(Error::NotEnoughData { needed: 4, remaining: 1 })
        ));
        assert!(matches!(decode_var_int(&[]), Err(Error::NotEnoughData { .. })));
    }

    #[test]
    fn test_reader_integers() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u16_be().unwrap(), 0x0102);
        assert_eq!(reader.read_u16_le().unwrap(), 0x0403);
        assert_eq!(reader.read_u32_be().unwrap(), 0x05060708);
        assert!(reader.is_empty());

        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u64_le().unwrap(), 0x0807060504030201);
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u64_be().unwrap(), 0x0102030405060708);
        assert!(reader.read_u8().is_err());
    }

    #[test]
    fn test_writer_mirrors_reader() {
        let mut writer = ByteWriter::new();
        writer.write_u8(7);
        writer.write_u16_le(0xbeef);
        writer.write_u32_be(0xdeadbeef);
        writer.write_u64_le(42);
        writer.write_var_bytes(b"hello world");
        let bytes = writer.into_bytes();

        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert_eq!(reader.read_u16_le().unwrap(), 0xbeef);
        assert_eq!(reader.read_u32_be().unwrap(), 0xdeadbeef);
        assert_eq!(reader.read_u64_le().unwrap(), 42);
        assert_eq!(reader.read_var_bytes().unwrap(), b"hello world");
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn test_var_bytes_declared_length_too_large() {
        let data = [0x05, 0x01, 0x02];
        let mut reader = ByteReader::new(&data);
        assert!(matches!(reader.read_var_bytes(), Err(Error::InvalidSize(_))));
    }

    #[test]
    fn test_finish_reports_trailing_bytes() {
        let data = [1, 2, 3];
        let mut reader = ByteReader::new(&data);
        reader.read_u8().unwrap();
        assert_eq!(reader.finish(), Err(Error::TooMuchData(2)));
    }
}
