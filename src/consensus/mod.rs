// Consensus rules: script execution, retargeting and verification

pub mod constants;
pub mod interpreter;
pub mod pow;
pub mod validation;

pub use interpreter::{eval_standalone, Interpreter, ScriptFailure, ScriptOutcome, SpendContext};
pub use pow::new_target;
pub use validation::{BlockVerifier, TxVerifier};
