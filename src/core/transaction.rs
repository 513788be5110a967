// Transaction data structures

use crate::core::{
    blake3_hash, double_blake3_hash, ByteReader, ByteWriter, Hash256, Script, Serializable,
};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Output index of the mint sentinel input
pub const MINT_INPUT_N_OUT: u32 = 0xffff_ffff;

/// Transaction input - references a previous transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    /// Id of the transaction holding the spent output
    pub input_tx_id: Hash256,
    /// Index of the spent output
    pub input_tx_n_out: u32,
    /// Input script - proves the right to spend
    pub script: Script,
    /// Relative lock, checked by CHECKLOCKRELVERIFY
    pub lock_rel: u32,
}

impl TxIn {
    pub fn new(input_tx_id: Hash256, input_tx_n_out: u32, script: Script, lock_rel: u32) -> Self {
        Self {
            input_tx_id,
            input_tx_n_out,
            script,
            lock_rel,
        }
    }

    /// Sentinel input of a mint transaction
    pub fn mint(script: Script) -> Self {
        Self::new(Hash256::zero(), MINT_INPUT_N_OUT, script, 0)
    }

    /// Input spending an expired output; `lock_rel` must cover the output's lock
    pub fn expired(input_tx_id: Hash256, input_tx_n_out: u32, lock_rel: u32) -> Self {
        Self::new(input_tx_id, input_tx_n_out, Script::expired_input(), lock_rel)
    }

    /// Check if this is the mint sentinel
    pub fn is_mint_input(&self) -> bool {
        self.input_tx_id.is_zero() && self.input_tx_n_out == MINT_INPUT_N_OUT
    }

    pub fn is_expired(&self) -> bool {
        self.script.is_expired_input()
    }
}

impl Serializable for TxIn {
    fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_bytes(self.input_tx_id.as_bytes());
        writer.write_u32_be(self.input_tx_n_out);
        writer.write_var_bytes(&self.script.to_bytes());
        writer.write_u32_be(self.lock_rel);
    }

    fn read_from(reader: &mut ByteReader) -> Result<Self> {
        let input_tx_id = Hash256::new(reader.read_fixed()?);
        let input_tx_n_out = reader.read_u32_be()?;
        let script = Script::from_bytes(reader.read_var_bytes()?)?;
        let lock_rel = reader.read_u32_be()?;
        Ok(Self {
            input_tx_id,
            input_tx_n_out,
            script,
            lock_rel,
        })
    }
}

/// Transaction output - amount and spending condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: u64,
    pub script: Script,
}

impl TxOut {
    pub fn new(value: u64, script: Script) -> Self {
        Self { value, script }
    }
}

impl Serializable for TxOut {
    fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u64_be(self.value);
        writer.write_var_bytes(&self.script.to_bytes());
    }

    fn read_from(reader: &mut ByteReader) -> Result<Self> {
        let value = reader.read_u64_be()?;
        let script = Script::from_bytes(reader.read_var_bytes()?)?;
        Ok(Self { value, script })
    }
}

/// Transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    pub version: u8,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    /// Absolute lock, checked by CHECKLOCKABSVERIFY
    pub lock_abs: u32,
}

impl Tx {
    pub fn new(version: u8, inputs: Vec<TxIn>, outputs: Vec<TxOut>, lock_abs: u32) -> Self {
        Self {
            version,
            inputs,
            outputs,
            lock_abs,
        }
    }

    /// Mint transaction: sentinel input plus the given expired-spend inputs
    pub fn mint(mint_script: Script, expired: Vec<TxIn>, outputs: Vec<TxOut>, lock_abs: u32) -> Self {
        let mut inputs = vec![TxIn::mint(mint_script)];
        inputs.extend(expired);
        Self::new(0, inputs, outputs, lock_abs)
    }

    /// Input 0 is the sentinel and every later input is an expired-spend
    pub fn is_mint_tx(&self) -> bool {
        match self.inputs.split_first() {
            Some((first, rest)) => {
                first.is_mint_input()
                    && rest.iter().all(|input| input.is_expired() && !input.is_mint_input())
            }
            None => false,
        }
    }

    /// Single BLAKE3 of the serialized transaction
    pub fn hash(&self) -> Hash256 {
        blake3_hash(&self.to_wire())
    }

    /// Transaction id: double BLAKE3 of the serialized transaction
    pub fn id(&self) -> Hash256 {
        double_blake3_hash(&self.to_wire())
    }

    /// Sum of output values, `None` on overflow
    pub fn total_output_value(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.value))
    }

    /// Double hash of every (input tx id, output index)
    pub fn hash_prevouts(&self) -> Hash256 {
        let mut writer = ByteWriter::with_capacity(self.inputs.len() * 36);
        for input in &self.inputs {
            writer.write_bytes(input.input_tx_id.as_bytes());
            writer.write_u32_be(input.input_tx_n_out);
        }
        double_blake3_hash(&writer.into_bytes())
    }

    /// Double hash of every input's relative lock
    pub fn hash_lock_rel(&self) -> Hash256 {
        let mut writer = ByteWriter::with_capacity(self.inputs.len() * 4);
        for input in &self.inputs {
            writer.write_u32_be(input.lock_rel);
        }
        double_blake3_hash(&writer.into_bytes())
    }

    /// Double hash of every serialized output
    pub fn hash_outputs(&self) -> Hash256 {
        let mut writer = ByteWriter::new();
        for output in &self.outputs {
            output.write_to(&mut writer);
        }
        double_blake3_hash(&writer.into_bytes())
    }
}

impl Serializable for Tx {
    fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u8(self.version);
        writer.write_var_int(self.inputs.len() as u64);
        for input in &self.inputs {
            input.write_to(writer);
        }
        writer.write_var_int(self.outputs.len() as u64);
        for output in &self.outputs {
            output.write_to(writer);
        }
        writer.write_u32_be(self.lock_abs);
    }

    fn read_from(reader: &mut ByteReader) -> Result<Self> {
        let version = reader.read_u8()?;

        // Capacity is capped by the bytes left
        let input_count = reader.read_var_len()?;
        let mut inputs = Vec::with_capacity(input_count.min(reader.remaining()));
        for _ in 0..input_count {
            inputs.push(TxIn::read_from(reader)?);
        }

        let output_count = reader.read_var_len()?;
        let mut outputs = Vec::with_capacity(output_count.min(reader.remaining()));
        for _ in 0..output_count {
            outputs.push(TxOut::read_from(reader)?);
        }

        let lock_abs = reader.read_u32_be()?;
        Ok(Self {
            version,
            inputs,
            outputs,
            lock_abs,
        })
    }
}
