// Core ledger data structures and wire formats

mod types;
mod hash;
mod serialize;
pub mod opcode;
mod script_num;
pub mod script;
mod signature;
mod transaction;
mod tx_out_map;
mod sighash;
mod merkle;
mod block;

pub use types::*;
pub use hash::*;
pub use serialize::*;
pub use opcode::OpCode;
pub use script_num::ScriptNum;
pub use script::{Script, ScriptChunk};
pub use signature::*;
pub use transaction::*;
pub use tx_out_map::*;
pub use sighash::*;
pub use merkle::*;
pub use block::*;
