// Consensus constants

/// Blocks between difficulty adjustments
pub const BLOCKS_PER_ADJUSTMENT: u64 = 2016;

/// Intended seconds between blocks
pub const BLOCK_INTERVAL_SECONDS: u64 = 600;

/// Executed non-push opcodes allowed per script
pub const MAX_SCRIPT_OPS: usize = 10_000;

/// Largest shift accepted by LSHIFT/RSHIFT, in bits
pub const MAX_SHIFT_BITS: usize = 4096;

/// Largest stack element, in bytes
pub const MAX_ELEMENT_SIZE: usize = 4096;

/// Items allowed on the main and alt stacks combined
pub const MAX_STACK_DEPTH: usize = 1000;

/// Keys accepted by one CHECKMULTISIG
pub const MAX_MULTISIG_KEYS: usize = 20;

/// Header version produced by the block builder
pub const BLOCK_VERSION: u32 = 0;

/// Transaction version produced by the builders
pub const TX_VERSION: u8 = 0;
