// Transaction builder and signer

use crate::builder::KeyStore;
use crate::consensus::constants::TX_VERSION;
use crate::core::{
    Hash256, HashCache, OutputLookup, Script, SighashType, SignatureScheme, Tx, TxIn, TxOut,
};
use crate::error::{Error, Result};

/// Assembles an unsigned transaction from known spendable outputs
pub struct TxBuilder<'a, L: OutputLookup + ?Sized> {
    outputs: &'a L,
    change_script: Script,
    inputs: Vec<TxIn>,
    tx_outputs: Vec<TxOut>,
    input_amount: u64,
    lock_abs: u32,
}

impl<'a, L: OutputLookup + ?Sized> TxBuilder<'a, L> {
    /// Create a builder; leftover value goes to `change_script`
    pub fn new(outputs: &'a L, change_script: Script) -> Self {
        Self {
            outputs,
            change_script,
            inputs: Vec::new(),
            tx_outputs: Vec::new(),
            input_amount: 0,
            lock_abs: 0,
        }
    }

    pub fn lock_abs(&mut self, lock_abs: u32) -> &mut Self {
        self.lock_abs = lock_abs;
        self
    }

    /// Spend `tx_id:n_out`, which must be a PKH or expirable PKH output
    pub fn add_input(&mut self, tx_id: Hash256, n_out: u32) -> Result<&mut Self> {
        let spent = self
            .outputs
            .get_output(&tx_id, n_out)
            .ok_or_else(|| Error::Build(format!("unknown output {}:{}", tx_id, n_out)))?;
        if spent.script.signing_pubkey_hash().is_none() {
            return Err(Error::Build(format!(
                "output {}:{} is not a pay-to-pubkey-hash script",
                tx_id, n_out
            )));
        }
        self.input_amount = self
            .input_amount
            .checked_add(spent.value)
            .ok_or_else(|| Error::Build("input value overflows".to_string()))?;
        self.inputs.push(TxIn::new(tx_id, n_out, Script::empty(), 0));
        Ok(self)
    }

    pub fn add_output(&mut self, value: u64, script: Script) -> &mut Self {
        self.tx_outputs.push(TxOut::new(value, script));
        self
    }

    /// Value of the inputs added so far
    pub fn input_amount(&self) -> u64 {
        self.input_amount
    }

    /// Build the unsigned transaction, adding a change output when value is left over
    pub fn build(&self) -> Result<Tx> {
        if self.inputs.is_empty() {
            return Err(Error::Build("no inputs".to_string()));
        }
        let total_out = self
            .tx_outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.value))
            .ok_or_else(|| Error::Build("output value overflows".to_string()))?;
        if total_out > self.input_amount {
            return Err(Error::Build(format!(
                "insufficient funds: have {}, need {}",
                self.input_amount, total_out
            )));
        }

        let mut outputs = self.tx_outputs.clone();
        let change = self.input_amount - total_out;
        if change > 0 {
            outputs.push(TxOut::new(change, self.change_script.clone()));
        }
        Ok(Tx::new(TX_VERSION, self.inputs.clone(), outputs, self.lock_abs))
    }
}

/// Signs the PKH inputs of a transaction with keys from a key store
pub struct TxSigner<'a, L: OutputLookup + ?Sized> {
    outputs: &'a L,
    keys: &'a KeyStore,
    scheme: &'a dyn SignatureScheme,
    hash_type: SighashType,
}

impl<'a, L: OutputLookup + ?Sized> TxSigner<'a, L> {
    pub fn new(outputs: &'a L, keys: &'a KeyStore, scheme: &'a dyn SignatureScheme) -> Self {
        Self {
            outputs,
            keys,
            scheme,
            hash_type: SighashType::ALL,
        }
    }

    pub fn with_hash_type(mut self, hash_type: SighashType) -> Self {
        self.hash_type = hash_type;
        self
    }

    /// Sign every input except mint and expired-spend inputs
    ///
    /// Signatures are computed first against one cache, then written into
    /// the input scripts.
    pub fn sign(&self, mut tx: Tx) -> Result<Tx> {
        let mut scripts = Vec::with_capacity(tx.inputs.len());
        {
            let cache = HashCache::new(&tx);
            for (index, input) in tx.inputs.iter().enumerate() {
                if input.is_mint_input() || input.is_expired() {
                    continue;
                }
                scripts.push((index, self.input_script(&cache, index, input)?));
            }
        }
        for (index, script) in scripts {
            tx.inputs[index].script = script;
        }
        log::debug!("signed transaction {}", tx.id());
        Ok(tx)
    }

    fn input_script(&self, cache: &HashCache<'_>, index: usize, input: &TxIn) -> Result<Script> {
        let spent = self
            .outputs
            .get_output(&input.input_tx_id, input.input_tx_n_out)
            .ok_or_else(|| {
                Error::Build(format!(
                    "unknown output {}:{}",
                    input.input_tx_id, input.input_tx_n_out
                ))
            })?;
        let pkh = spent
            .script
            .signing_pubkey_hash()
            .ok_or_else(|| Error::Build(format!("input {} does not spend a PKH output", index)))?;
        let keypair = self
            .keys
            .get(&pkh)
            .ok_or_else(|| Error::Build(format!("no key for {}", pkh)))?;

        let signature = cache.sign(
            self.scheme,
            index,
            &keypair.privkey,
            &spent.script.to_bytes(),
            spent.value,
            self.hash_type,
        )?;
        Script::pkh_input(&signature.to_bytes(), keypair.pubkey.as_bytes())
    }
}
