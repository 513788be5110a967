// Ledger core: wire formats, script execution and block verification

pub mod builder;
pub mod cli;
pub mod config;
pub mod consensus;
pub mod core;
pub mod error;

// Re-exports for convenience
pub use builder::{BlockBuilder, KeyStore, TxBuilder, TxSigner};
pub use cli::{Cli, CliHandler};
pub use config::ConsensusParams;
pub use consensus::{BlockVerifier, Interpreter, ScriptFailure, ScriptOutcome, TxVerifier};
pub use self::core::{
    Block, BlockHeader, Hash256, HashCache, OutputLookup, Script, ScriptChunk, Serializable, Tx,
    TxIn, TxOut, TxOutMap,
};
pub use error::{Error, Result, VerificationError};
