// Error types for decoding, parsing and verification

use crate::consensus::interpreter::ScriptFailure;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Structural and semantic errors
///
/// Structural errors (everything except `Verification`) are raised while
/// decoding bytes or text and mean the input was never a well-formed value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A read would go past the end of the buffer
    #[error("not enough data: needed {needed} bytes, {remaining} remaining")]
    NotEnoughData { needed: usize, remaining: usize },

    /// Bytes were left over after a complete value was decoded
    #[error("too much data: {0} trailing bytes")]
    TooMuchData(usize),

    /// A length prefix does not match the payload
    #[error("invalid size: {0}")]
    InvalidSize(String),

    /// A value was encoded in a longer form than necessary
    #[error("non-minimal encoding: {0}")]
    NonMinimalEncoding(String),

    /// Opcode byte or name not in the opcode table
    #[error("invalid opcode: {0}")]
    InvalidOpcode(String),

    /// Text could not be parsed
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Hex text could not be decoded
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// An integer does not fit the type it is converted into
    #[error("insufficient precision: {0}")]
    InsufficientPrecision(String),

    /// Key or signature bytes rejected by the signature scheme
    #[error("invalid key or signature: {0}")]
    InvalidKey(String),

    /// Consensus rule violation
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// Parameter file could not be read or parsed
    #[error("config error: {0}")]
    Config(String),

    /// A builder was asked for something the available outputs or keys cannot provide
    #[error("build error: {0}")]
    Build(String),
}

/// Semantic rejection of a header, block, transaction or script
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("invalid header: {0}")]
    Header(String),

    #[error("invalid block: {0}")]
    Block(String),

    #[error("invalid transaction {tx_index}: {reason}")]
    Tx { tx_index: usize, reason: String },

    #[error("script failed in transaction {tx_index} input {input_index}: {reason}")]
    Script {
        tx_index: usize,
        input_index: usize,
        reason: ScriptFailure,
    },
}

impl VerificationError {
    /// Re-tag a transaction-level error with its position in a block
    pub fn at_tx(self, index: usize) -> Self {
        match self {
            VerificationError::Tx { reason, .. } => VerificationError::Tx {
                tx_index: index,
                reason,
            },
            VerificationError::Script {
                input_index,
                reason,
                ..
            } => VerificationError::Script {
                tx_index: index,
                input_index,
                reason,
            },
            other => other,
        }
    }
}
