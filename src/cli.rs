// CLI commands

use crate::config::ConsensusParams;
use crate::consensus::{new_target, Interpreter, ScriptOutcome};
use crate::core::{Block, BlockHeader, Hash256, HashCache, Script, Serializable, SighashType, Tx};
use crate::error::{Error, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ledger-core")]
#[command(about = "Inspect and check ledger transactions, scripts and headers", long_about = None)]
pub struct Cli {
    /// JSON file overriding consensus parameters
    #[arg(long, global = true)]
    pub params: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transaction commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Script commands
    #[command(subcommand)]
    Script(ScriptCommands),

    /// Block header commands
    #[command(subcommand)]
    Header(HeaderCommands),

    /// Block commands
    #[command(subcommand)]
    Block(BlockCommands),
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Decode a hex transaction
    Decode {
        hex: String,
    },

    /// Compute the signature hash of one input
    Sighash {
        /// Hex transaction
        hex: String,
        /// Input index
        #[arg(long, default_value = "0")]
        input: usize,
        /// Script of the spent output, in text form
        #[arg(long, default_value = "")]
        script: String,
        /// Value of the spent output
        #[arg(long)]
        amount: u64,
        /// Hash type byte
        #[arg(long, default_value = "1")]
        hash_type: u8,
    },
}

#[derive(Subcommand)]
pub enum ScriptCommands {
    /// Evaluate a script without a transaction
    Run {
        text: String,
    },

    /// Convert text form to hex
    Hex {
        text: String,
    },

    /// Convert hex to text form
    Text {
        hex: String,
    },
}

#[derive(Subcommand)]
pub enum HeaderCommands {
    /// Decode a hex header
    Decode {
        hex: String,
    },

    /// Compute the next target for an adjustment period
    Retarget {
        /// Previous target, 64 hex characters
        #[arg(long)]
        target: String,
        /// Seconds the period took
        #[arg(long)]
        time_diff: u64,
    },
}

#[derive(Subcommand)]
pub enum BlockCommands {
    /// Decode a hex block
    Decode {
        hex: String,
    },
}

/// CLI handler
pub struct CliHandler {
    params: ConsensusParams,
}

impl CliHandler {
    pub fn new(params: ConsensusParams) -> Self {
        Self { params }
    }

    /// Load parameters from `--params` if given
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let params = match &cli.params {
            Some(path) => ConsensusParams::load(path)?,
            None => ConsensusParams::default(),
        };
        Ok(Self::new(params))
    }

    /// Handle CLI command
    pub fn handle(&self, cli: Cli) -> Result<()> {
        let output = match cli.command {
            Commands::Tx(cmd) => self.handle_tx(cmd)?,
            Commands::Script(cmd) => self.handle_script(cmd)?,
            Commands::Header(cmd) => self.handle_header(cmd)?,
            Commands::Block(cmd) => self.handle_block(cmd)?,
        };
        println!("{}", output);
        Ok(())
    }

    fn handle_tx(&self, cmd: TxCommands) -> Result<String> {
        match cmd {
            TxCommands::Decode { hex } => {
                let tx = Tx::from_hex(&hex)?;
                to_json(&json!({
                    "id": tx.id(),
                    "mint": tx.is_mint_tx(),
                    "tx": tx,
                }))
            }
            TxCommands::Sighash {
                hex,
                input,
                script,
                amount,
                hash_type,
            } => {
                let tx = Tx::from_hex(&hex)?;
                let script = Script::from_text(&script)?;
                let cache = HashCache::new(&tx);
                let hash_type = SighashType(hash_type);
                let preimage = cache.sighash_preimage(input, &script.to_bytes(), amount, hash_type)?;
                let sighash = cache.sighash(input, &script.to_bytes(), amount, hash_type)?;
                to_json(&json!({
                    "preimage": hex::encode(preimage),
                    "sighash": sighash,
                }))
            }
        }
    }

    fn handle_script(&self, cmd: ScriptCommands) -> Result<String> {
        match cmd {
            ScriptCommands::Run { text } => {
                let script = Script::from_text(&text)?;
                let outcome =
                    Interpreter::new(&script, Vec::new(), None, self.params.max_script_ops).evaluate();
                log::info!("evaluated {} chunks", script.len());
                Ok(match outcome {
                    ScriptOutcome::Success { return_value } => to_json(&json!({
                        "success": true,
                        "return_value": hex::encode(return_value),
                    }))?,
                    ScriptOutcome::Failure {
                        return_value,
                        reason,
                    } => to_json(&json!({
                        "success": false,
                        "return_value": return_value.map(hex::encode),
                        "reason": reason.to_string(),
                    }))?,
                })
            }
            ScriptCommands::Hex { text } => Ok(hex::encode(Script::from_text(&text)?.to_bytes())),
            ScriptCommands::Text { hex } => Ok(Script::from_bytes(&hex::decode(hex)?)?.to_text()),
        }
    }

    fn handle_header(&self, cmd: HeaderCommands) -> Result<String> {
        match cmd {
            HeaderCommands::Decode { hex } => {
                let header = BlockHeader::from_hex(&hex)?;
                to_json(&json!({
                    "id": header.id(),
                    "hash": header.hash(),
                    "genesis": header.is_genesis(),
                    "target_valid": header.is_target_valid(),
                    "adjustment": self.params.is_adjustment_index(header.index),
                    "header": header,
                }))
            }
            HeaderCommands::Retarget { target, time_diff } => {
                let prev = Hash256::from_hex(&target)?;
                Ok(new_target(&prev, time_diff, &self.params)?.to_hex())
            }
        }
    }

    fn handle_block(&self, cmd: BlockCommands) -> Result<String> {
        match cmd {
            BlockCommands::Decode { hex } => {
                let block = Block::from_hex(&hex)?;
                let tx_ids: Vec<Hash256> = block.txs.iter().map(Tx::id).collect();
                to_json(&json!({
                    "id": block.id(),
                    "merkle_root_valid": block.is_valid_merkle_root(),
                    "tx_ids": tx_ids,
                    "block": block,
                }))
            }
        }
    }
}

fn to_json(value: &serde_json::Value) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| Error::InvalidEncoding(e.to_string()))
}
