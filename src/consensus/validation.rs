// Transaction, header and block verification

use crate::config::ConsensusParams;
use crate::consensus::interpreter::{Interpreter, ScriptFailure, ScriptOutcome, SpendContext};
use crate::core::{
    Block, BlockHeader, HashCache, Hash256, OutputLookup, SignatureScheme, Tx, TxOut,
};
use crate::error::VerificationError;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

/// Verifies one transaction against the outputs it spends
///
/// Errors carry `tx_index` 0; block verification re-tags them.
pub struct TxVerifier<'a, L: OutputLookup + ?Sized> {
    tx: &'a Tx,
    outputs: &'a L,
    params: &'a ConsensusParams,
    scheme: &'a dyn SignatureScheme,
}

impl<'a, L: OutputLookup + ?Sized> TxVerifier<'a, L> {
    pub fn new(
        tx: &'a Tx,
        outputs: &'a L,
        params: &'a ConsensusParams,
        scheme: &'a dyn SignatureScheme,
    ) -> Self {
        Self {
            tx,
            outputs,
            params,
            scheme,
        }
    }

    /// Run every check: structure, scripts, then value balance
    pub fn verify(&self) -> Result<(), VerificationError> {
        self.verify_structure()?;
        self.verify_scripts()?;
        self.verify_amounts()
    }

    /// Non-empty, no output-value overflow, no input spent twice
    pub fn verify_structure(&self) -> Result<(), VerificationError> {
        if self.tx.inputs.is_empty() {
            return Err(tx_error("no inputs"));
        }
        if self.tx.outputs.is_empty() {
            return Err(tx_error("no outputs"));
        }
        if self.tx.total_output_value().is_none() {
            return Err(tx_error("output value overflows"));
        }

        let mut seen = HashSet::with_capacity(self.tx.inputs.len());
        for input in &self.tx.inputs {
            if !seen.insert((input.input_tx_id, input.input_tx_n_out)) {
                return Err(tx_error(&format!(
                    "duplicate input {}:{}",
                    input.input_tx_id, input.input_tx_n_out
                )));
            }
        }

        if !self.tx.is_mint_tx() && self.tx.inputs.iter().any(|input| input.is_mint_input()) {
            return Err(tx_error("mint input outside a mint transaction"));
        }
        Ok(())
    }

    /// Inputs in order with one shared sighash cache
    pub fn verify_scripts(&self) -> Result<(), VerificationError> {
        let cache = HashCache::new(self.tx);
        for index in 0..self.tx.inputs.len() {
            self.verify_input(&cache, index)?;
        }
        Ok(())
    }

    /// Run the input script, then the spent output's script on the resulting stack
    pub fn verify_input(&self, cache: &HashCache<'_>, index: usize) -> Result<(), VerificationError> {
        let input = self
            .tx
            .inputs
            .get(index)
            .ok_or_else(|| tx_error(&format!("no input {}", index)))?;
        if input.is_mint_input() {
            return Ok(());
        }
        let spent = self.spent_output(index)?;
        let script_error = |reason: ScriptFailure| {
            log::debug!("input {} rejected: {}", index, reason);
            VerificationError::Script {
                tx_index: 0,
                input_index: index,
                reason,
            }
        };

        if !input.script.is_push_only() {
            return Err(script_error(ScriptFailure::NotPushOnly));
        }

        let context = SpendContext {
            cache,
            input_index: index,
            amount: spent.value,
            scheme: self.scheme,
        };
        let mut unlock = Interpreter::new(&input.script, Vec::new(), Some(context), self.params.max_script_ops);
        unlock.execute().map_err(script_error)?;

        let lock = Interpreter::new(&spent.script, unlock.into_stack(), Some(context), self.params.max_script_ops);
        match lock.evaluate() {
            ScriptOutcome::Success { .. } => Ok(()),
            ScriptOutcome::Failure { reason, .. } => Err(script_error(reason)),
        }
    }

    /// Spent value covers the outputs; mint transactions are exempt
    pub fn verify_amounts(&self) -> Result<(), VerificationError> {
        if self.tx.is_mint_tx() {
            return Ok(());
        }
        let mut total_in = 0u64;
        for index in 0..self.tx.inputs.len() {
            total_in = total_in
                .checked_add(self.spent_output(index)?.value)
                .ok_or_else(|| tx_error("input value overflows"))?;
        }
        let total_out = self
            .tx
            .total_output_value()
            .ok_or_else(|| tx_error("output value overflows"))?;
        if total_out > total_in {
            return Err(tx_error(&format!(
                "outputs {} exceed inputs {}",
                total_out, total_in
            )));
        }
        Ok(())
    }

    fn spent_output(&self, index: usize) -> Result<&'a TxOut, VerificationError> {
        let input = &self.tx.inputs[index];
        let outputs: &'a L = self.outputs;
        outputs
            .get_output(&input.input_tx_id, input.input_tx_n_out)
            .ok_or_else(|| {
                tx_error(&format!(
                    "input {} spends unknown output {}:{}",
                    index, input.input_tx_id, input.input_tx_n_out
                ))
            })
    }
}

fn tx_error(reason: &str) -> VerificationError {
    VerificationError::Tx {
        tx_index: 0,
        reason: reason.to_string(),
    }
}

fn header_error(reason: String) -> VerificationError {
    VerificationError::Header(reason)
}

/// Outputs visible to transaction `before` of a block: the external set plus
/// outputs of earlier transactions in the same block
struct BlockOutputs<'a, L: OutputLookup + ?Sized> {
    base: &'a L,
    created: &'a HashMap<(Hash256, u32), (usize, TxOut)>,
    before: usize,
}

impl<L: OutputLookup + ?Sized> OutputLookup for BlockOutputs<'_, L> {
    fn get_output(&self, tx_id: &Hash256, n_out: u32) -> Option<&TxOut> {
        match self.created.get(&(*tx_id, n_out)) {
            Some((index, output)) if *index < self.before => Some(output),
            Some(_) => None,
            None => self.base.get_output(tx_id, n_out),
        }
    }
}

/// Verifies headers and whole blocks
pub struct BlockVerifier<'a> {
    params: &'a ConsensusParams,
    scheme: &'a dyn SignatureScheme,
}

impl<'a> BlockVerifier<'a> {
    pub fn new(params: &'a ConsensusParams, scheme: &'a dyn SignatureScheme) -> Self {
        Self { params, scheme }
    }

    /// Check proof of work and, when `prev` is given, the chain link and target
    pub fn verify_header(
        &self,
        header: &BlockHeader,
        prev: Option<&BlockHeader>,
        prev_adjustment: Option<&BlockHeader>,
    ) -> Result<(), VerificationError> {
        // Genesis is not mined
        if !header.is_genesis() && !header.is_target_valid() {
            return Err(header_error(format!(
                "hash {} does not meet target {}",
                header.hash(),
                header.target
            )));
        }

        let Some(prev) = prev else {
            if !header.is_genesis() {
                return Err(header_error("missing previous header".to_string()));
            }
            return Ok(());
        };

        if header.prev_block_id != prev.id() {
            return Err(header_error(format!(
                "previous id {} does not match {}",
                header.prev_block_id,
                prev.id()
            )));
        }
        if prev.index.checked_add(1) != Some(header.index) {
            return Err(header_error(format!(
                "index {} does not follow {}",
                header.index, prev.index
            )));
        }
        if header.timestamp < prev.timestamp {
            return Err(header_error(format!(
                "timestamp {} precedes previous {}",
                header.timestamp, prev.timestamp
            )));
        }
        let expected = header
            .expected_target(prev, prev_adjustment, self.params)
            .map_err(|e| header_error(e.to_string()))?;
        if header.target != expected {
            return Err(header_error(format!(
                "target {} expected {}",
                header.target, expected
            )));
        }
        Ok(())
    }

    /// Full check of a block
    ///
    /// Transactions are verified in parallel; the reported failure is the
    /// first by transaction index, then input index.
    pub fn verify_block<L: OutputLookup + Sync + ?Sized>(
        &self,
        block: &Block,
        outputs: &L,
        prev: Option<&BlockHeader>,
        prev_adjustment: Option<&BlockHeader>,
    ) -> Result<(), VerificationError> {
        self.verify_header(&block.header, prev, prev_adjustment)?;

        let Some(mint) = block.txs.first() else {
            return Err(VerificationError::Block("no transactions".to_string()));
        };
        if !mint.is_mint_tx() {
            return Err(VerificationError::Block("first transaction is not a mint".to_string()));
        }
        if !mint.inputs[0].script.starts_with_block_index(block.header.index) {
            return Err(VerificationError::Block(format!(
                "mint input does not push block index {}",
                block.header.index
            )));
        }
        if let Some(position) = block.txs[1..].iter().position(|tx| tx.is_mint_tx()) {
            return Err(VerificationError::Block(format!(
                "extra mint transaction at {}",
                position + 1
            )));
        }
        if !block.is_valid_merkle_root() {
            return Err(VerificationError::Block(format!(
                "merkle root {} expected {}",
                block.header.merkle_root,
                block.merkle_root()
            )));
        }

        let double_spends = double_spends(block);

        let mut created = HashMap::new();
        for (index, tx) in block.txs.iter().enumerate() {
            let tx_id = tx.id();
            for (n_out, output) in tx.outputs.iter().enumerate() {
                created.insert((tx_id, n_out as u32), (index, output.clone()));
            }
        }

        let results: Vec<Result<(), VerificationError>> = block
            .txs
            .par_iter()
            .enumerate()
            .map(|(index, tx)| {
                if let Some(error) = &double_spends[index] {
                    return Err(error.clone());
                }
                let visible = BlockOutputs {
                    base: outputs,
                    created: &created,
                    before: index,
                };
                TxVerifier::new(tx, &visible, self.params, self.scheme)
                    .verify()
                    .map_err(|e| e.at_tx(index))
            })
            .collect();

        match results.into_iter().find_map(Result::err) {
            Some(error) => {
                log::debug!("block {} rejected: {}", block.id(), error);
                Err(error)
            }
            None => Ok(()),
        }
    }

}

/// Per transaction, the first input spending an output an earlier
/// transaction of the block already spent
fn double_spends(block: &Block) -> Vec<Option<VerificationError>> {
    let mut spent = HashSet::new();
    block
        .txs
        .iter()
        .enumerate()
        .map(|(index, tx)| {
            let mut first = None;
            for input in tx.inputs.iter().filter(|input| !input.is_mint_input()) {
                let outpoint = (input.input_tx_id, input.input_tx_n_out);
                if !spent.insert(outpoint) && first.is_none() {
                    first = Some(VerificationError::Tx {
                        tx_index: index,
                        reason: format!(
                            "output {}:{} already spent in this block",
                            input.input_tx_id, input.input_tx_n_out
                        ),
                    });
                }
            }
            first
        })
        .collect()
}
