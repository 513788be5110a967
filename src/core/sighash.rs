// Signature hashes: preimage construction, memoized sub-hashes, sign/verify

use crate::core::{
    double_blake3_hash, ByteWriter, Hash256, PrivKey, PubKeyBuf, Serializable, SigBuf,
    SignatureScheme, Tx,
};
use crate::error::{Error, Result, VerificationError};
use std::cell::OnceCell;
use std::fmt;

/// Hash type selecting which transaction fields a signature commits to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SighashType(pub u8);

impl SighashType {
    pub const ALL: SighashType = SighashType(0x01);
    pub const NONE: SighashType = SighashType(0x02);
    pub const SINGLE: SighashType = SighashType(0x03);
    pub const ANYONECANPAY: u8 = 0x80;

    /// Low five bits
    pub fn base(self) -> u8 {
        self.0 & 0x1f
    }

    pub fn anyone_can_pay(self) -> bool {
        self.0 & Self::ANYONECANPAY != 0
    }

    pub fn is_single(self) -> bool {
        self.base() == Self::SINGLE.0
    }

    pub fn is_none(self) -> bool {
        self.base() == Self::NONE.0
    }

    pub fn with_anyone_can_pay(self) -> Self {
        SighashType(self.0 | Self::ANYONECANPAY)
    }
}

impl Default for SighashType {
    fn default() -> Self {
        Self::ALL
    }
}

/// Signature as carried in an input script: `hash_type(1) | compact sig(64)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxSignature {
    pub hash_type: SighashType,
    pub sig: SigBuf,
}

impl TxSignature {
    pub const SIZE: usize = 65;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.push(self.hash_type.0);
        out.extend_from_slice(self.sig.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(Error::InvalidSize(format!(
                "signature must be {} bytes, got {}",
                Self::SIZE,
                bytes.len()
            )));
        }
        Ok(Self {
            hash_type: SighashType(bytes[0]),
            sig: SigBuf::from_slice(&bytes[1..])?,
        })
    }
}

impl fmt::Display for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

/// Source of the three per-transaction sub-hashes
trait SubHashes {
    fn tx(&self) -> &Tx;
    fn prevouts(&self) -> Hash256;
    fn lock_rel(&self) -> Hash256;
    fn outputs(&self) -> Hash256;
}

impl SubHashes for Tx {
    fn tx(&self) -> &Tx {
        self
    }

    fn prevouts(&self) -> Hash256 {
        self.hash_prevouts()
    }

    fn lock_rel(&self) -> Hash256 {
        self.hash_lock_rel()
    }

    fn outputs(&self) -> Hash256 {
        self.hash_outputs()
    }
}

/// Memoized sub-hashes for one signing or verification session
///
/// The cache borrows its transaction, so the transaction cannot change while
/// the cache is alive.
pub struct HashCache<'tx> {
    tx: &'tx Tx,
    hash_prevouts: OnceCell<Hash256>,
    hash_lock_rel: OnceCell<Hash256>,
    hash_outputs: OnceCell<Hash256>,
}

impl<'tx> HashCache<'tx> {
    pub fn new(tx: &'tx Tx) -> Self {
        Self {
            tx,
            hash_prevouts: OnceCell::new(),
            hash_lock_rel: OnceCell::new(),
            hash_outputs: OnceCell::new(),
        }
    }

    pub fn tx(&self) -> &'tx Tx {
        self.tx
    }

    pub fn hash_prevouts(&self) -> Hash256 {
        *self.hash_prevouts.get_or_init(|| self.tx.hash_prevouts())
    }

    pub fn hash_lock_rel(&self) -> Hash256 {
        *self.hash_lock_rel.get_or_init(|| self.tx.hash_lock_rel())
    }

    pub fn hash_outputs(&self) -> Hash256 {
        *self.hash_outputs.get_or_init(|| self.tx.hash_outputs())
    }

    pub fn sighash_preimage(
        &self,
        input_index: usize,
        script: &[u8],
        amount: u64,
        hash_type: SighashType,
    ) -> Result<Vec<u8>> {
        build_preimage(self, input_index, script, amount, hash_type)
    }

    pub fn sighash(
        &self,
        input_index: usize,
        script: &[u8],
        amount: u64,
        hash_type: SighashType,
    ) -> Result<Hash256> {
        Ok(double_blake3_hash(&self.sighash_preimage(
            input_index,
            script,
            amount,
            hash_type,
        )?))
    }

    /// Sign input `input_index` spending an output locked by `script`
    pub fn sign(
        &self,
        scheme: &dyn SignatureScheme,
        input_index: usize,
        privkey: &PrivKey,
        script: &[u8],
        amount: u64,
        hash_type: SighashType,
    ) -> Result<TxSignature> {
        let digest = self.sighash(input_index, script, amount, hash_type)?;
        let sig = scheme.sign(&digest, privkey)?;
        Ok(TxSignature { hash_type, sig })
    }

    /// Recompute the sighash for the signature's hash type and check it
    pub fn verify(
        &self,
        scheme: &dyn SignatureScheme,
        input_index: usize,
        pubkey: &PubKeyBuf,
        signature: &TxSignature,
        script: &[u8],
        amount: u64,
    ) -> Result<bool> {
        let digest = self.sighash(input_index, script, amount, signature.hash_type)?;
        Ok(scheme.verify(&digest, &signature.sig, pubkey))
    }
}

impl SubHashes for HashCache<'_> {
    fn tx(&self) -> &Tx {
        self.tx
    }

    fn prevouts(&self) -> Hash256 {
        self.hash_prevouts()
    }

    fn lock_rel(&self) -> Hash256 {
        self.hash_lock_rel()
    }

    fn outputs(&self) -> Hash256 {
        self.hash_outputs()
    }
}

fn build_preimage(
    hashes: &impl SubHashes,
    input_index: usize,
    script: &[u8],
    amount: u64,
    hash_type: SighashType,
) -> Result<Vec<u8>> {
    let tx = hashes.tx();
    let input = tx.inputs.get(input_index).ok_or_else(|| {
        Error::Verification(VerificationError::Tx {
            tx_index: 0,
            reason: format!(
                "input index {} out of range ({} inputs)",
                input_index,
                tx.inputs.len()
            ),
        })
    })?;

    let mut prevouts_hash = Hash256::zero();
    let mut lock_rel_hash = Hash256::zero();
    let mut outputs_hash = Hash256::zero();

    if !hash_type.anyone_can_pay() {
        prevouts_hash = hashes.prevouts();
    }

    if !hash_type.anyone_can_pay() && !hash_type.is_single() && !hash_type.is_none() {
        lock_rel_hash = hashes.lock_rel();
    }

    if !hash_type.is_single() && !hash_type.is_none() {
        outputs_hash = hashes.outputs();
    } else if hash_type.is_single() {
        if let Some(output) = tx.outputs.get(input_index) {
            outputs_hash = double_blake3_hash(&output.to_wire());
        }
    }

    let mut writer = ByteWriter::with_capacity(160 + script.len());
    writer.write_u8(tx.version);
    writer.write_bytes(prevouts_hash.as_bytes());
    writer.write_bytes(lock_rel_hash.as_bytes());
    writer.write_bytes(input.input_tx_id.as_bytes());
    writer.write_u32_be(input.input_tx_n_out);
    writer.write_var_bytes(script);
    writer.write_u64_be(amount);
    writer.write_u32_be(input.lock_rel);
    writer.write_bytes(outputs_hash.as_bytes());
    writer.write_u32_be(tx.lock_abs);
    writer.write_u8(hash_type.0);
    Ok(writer.into_bytes())
}

impl Tx {
    /// Preimage computed without a cache
    pub fn sighash_preimage(
        &self,
        input_index: usize,
        script: &[u8],
        amount: u64,
        hash_type: SighashType,
    ) -> Result<Vec<u8>> {
        build_preimage(self, input_index, script, amount, hash_type)
    }

    /// Sighash computed without a cache
    pub fn sighash_no_cache(
        &self,
        input_index: usize,
        script: &[u8],
        amount: u64,
        hash_type: SighashType,
    ) -> Result<Hash256> {
        Ok(double_blake3_hash(&self.sighash_preimage(
            input_index,
            script,
            amount,
            hash_type,
        )?))
    }

    pub fn sign_no_cache(
        &self,
        scheme: &dyn SignatureScheme,
        input_index: usize,
        privkey: &PrivKey,
        script: &[u8],
        amount: u64,
        hash_type: SighashType,
    ) -> Result<TxSignature> {
        let digest = self.sighash_no_cache(input_index, script, amount, hash_type)?;
        Ok(TxSignature {
            hash_type,
            sig: scheme.sign(&digest, privkey)?,
        })
    }

    pub fn verify_no_cache(
        &self,
        scheme: &dyn SignatureScheme,
        input_index: usize,
        pubkey: &PubKeyBuf,
        signature: &TxSignature,
        script: &[u8],
        amount: u64,
    ) -> Result<bool> {
        let digest = self.sighash_no_cache(input_index, script, amount, signature.hash_type)?;
        Ok(scheme.verify(&digest, &signature.sig, pubkey))
    }
}
