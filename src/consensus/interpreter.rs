// Script interpreter

use crate::consensus::constants::{
    MAX_ELEMENT_SIZE, MAX_MULTISIG_KEYS, MAX_SCRIPT_OPS, MAX_SHIFT_BITS, MAX_STACK_DEPTH,
};
use crate::core::opcode::opcode_name;
use crate::core::{
    blake3_hash, double_blake3_hash, HashCache, OpCode, PubKeyBuf, Script, ScriptNum,
    SignatureScheme, TxSignature,
};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use std::cell::OnceCell;

/// Reason a script did not succeed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptFailure {
    #[error("stack underflow")]
    StackUnderflow,
    #[error("alt stack underflow")]
    AltStackUnderflow,
    #[error("{0} failed")]
    VerifyFailed(String),
    #[error("unbalanced conditional")]
    UnbalancedConditional,
    #[error("unknown opcode {0}")]
    UnknownOpcode(String),
    #[error("invalid number: {0}")]
    InvalidNumber(String),
    #[error("range out of bounds")]
    InvalidRange,
    #[error("operand sizes differ")]
    OperandSizeMismatch,
    #[error("division by zero")]
    DivisionByZero,
    #[error("operation limit of {0} exceeded")]
    OpLimitExceeded(usize),
    #[error("stack element of {0} bytes exceeds the size limit")]
    ElementTooLarge(usize),
    #[error("stack depth limit of {0} exceeded")]
    StackOverflow(usize),
    #[error("stack is empty at end of script")]
    EmptyStack,
    #[error("top of stack is false")]
    FalseStackTop,
    #[error("input script is not push-only")]
    NotPushOnly,
    #[error("invalid signature encoding: {0}")]
    InvalidSignature(String),
    #[error("invalid public key encoding")]
    InvalidPubKey,
    #[error("lock not satisfied: requires {required}, has {actual}")]
    LockNotSatisfied { required: u64, actual: u64 },
    #[error("no transaction context: {0}")]
    NoTxContext(String),
}

/// Result of evaluating a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutcome {
    Success {
        return_value: Vec<u8>,
    },
    Failure {
        return_value: Option<Vec<u8>>,
        reason: ScriptFailure,
    },
}

impl ScriptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ScriptOutcome::Success { .. })
    }

    /// Top of the stack when the script stopped
    pub fn return_value(&self) -> Option<&[u8]> {
        match self {
            ScriptOutcome::Success { return_value } => Some(return_value),
            ScriptOutcome::Failure { return_value, .. } => return_value.as_deref(),
        }
    }

    pub fn failure(&self) -> Option<&ScriptFailure> {
        match self {
            ScriptOutcome::Success { .. } => None,
            ScriptOutcome::Failure { reason, .. } => Some(reason),
        }
    }
}

/// "Not all-zero"; the empty byte string is false
pub fn cast_to_bool(bytes: &[u8]) -> bool {
    bytes.iter().any(|b| *b != 0)
}

/// The transaction input a script is being evaluated for
#[derive(Clone, Copy)]
pub struct SpendContext<'a> {
    pub cache: &'a HashCache<'a>,
    pub input_index: usize,
    /// Value of the output being spent
    pub amount: u64,
    pub scheme: &'a dyn SignatureScheme,
}

type Step = Result<(), ScriptFailure>;

/// Stack machine over one script
pub struct Interpreter<'a> {
    script: &'a Script,
    context: Option<SpendContext<'a>>,
    max_ops: usize,
    pc: usize,
    stack: Vec<Vec<u8>>,
    alt_stack: Vec<Vec<u8>>,
    if_stack: Vec<bool>,
    op_count: usize,
    script_code: OnceCell<Vec<u8>>,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        script: &'a Script,
        stack: Vec<Vec<u8>>,
        context: Option<SpendContext<'a>>,
        max_ops: usize,
    ) -> Self {
        Self {
            script,
            context,
            max_ops,
            pc: 0,
            stack,
            alt_stack: Vec::new(),
            if_stack: Vec::new(),
            op_count: 0,
            script_code: OnceCell::new(),
        }
    }

    /// Interpreter with no transaction; signature and lock opcodes fail
    pub fn standalone(script: &'a Script) -> Self {
        Self::new(script, Vec::new(), None, MAX_SCRIPT_OPS)
    }

    pub fn stack(&self) -> &[Vec<u8>] {
        &self.stack
    }

    pub fn into_stack(self) -> Vec<Vec<u8>> {
        self.stack
    }

    pub fn op_count(&self) -> usize {
        self.op_count
    }

    /// Run every chunk; conditionals must balance
    pub fn execute(&mut self) -> Step {
        let script = self.script;
        while let Some(chunk) = script.chunks.get(self.pc) {
            let executing = self.if_stack.iter().all(|b| *b);

            if let Some(data) = chunk.data() {
                if executing {
                    self.push(data.to_vec())?;
                    self.check_depth()?;
                }
                self.pc += 1;
                continue;
            }

            match chunk.op() {
                Some(op) if op.is_conditional() => {
                    self.count_op()?;
                    self.step_conditional(op, executing)?;
                }
                _ if !executing => {}
                None => return Err(ScriptFailure::UnknownOpcode(opcode_name(chunk.opcode()))),
                Some(OpCode::Return) => break,
                Some(op) => {
                    self.count_op()?;
                    log::trace!("pc={} op={} depth={}", self.pc, op.name(), self.stack.len());
                    self.step(op)?;
                    self.check_depth()?;
                }
            }
            self.pc += 1;
        }

        if !self.if_stack.is_empty() {
            return Err(ScriptFailure::UnbalancedConditional);
        }
        Ok(())
    }

    /// Execute and judge the final stack top
    pub fn evaluate(mut self) -> ScriptOutcome {
        let result = self.execute().and_then(|()| match self.stack.last() {
            None => Err(ScriptFailure::EmptyStack),
            Some(top) if !cast_to_bool(top) => Err(ScriptFailure::FalseStackTop),
            Some(_) => Ok(()),
        });
        let top = self.stack.last().cloned();
        match (result, top) {
            (Ok(()), Some(return_value)) => ScriptOutcome::Success { return_value },
            (Ok(()), None) => ScriptOutcome::Failure {
                return_value: None,
                reason: ScriptFailure::EmptyStack,
            },
            (Err(reason), return_value) => {
                log::debug!("script failed at pc {}: {}", self.pc, reason);
                ScriptOutcome::Failure {
                    return_value,
                    reason,
                }
            }
        }
    }

    fn count_op(&mut self) -> Step {
        self.op_count += 1;
        if self.op_count > self.max_ops {
            return Err(ScriptFailure::OpLimitExceeded(self.max_ops));
        }
        Ok(())
    }

    fn step_conditional(&mut self, op: OpCode, executing: bool) -> Step {
        match op {
            OpCode::If | OpCode::NotIf => {
                let mut branch = false;
                if executing {
                    branch = cast_to_bool(&self.pop()?);
                    if op == OpCode::NotIf {
                        branch = !branch;
                    }
                }
                self.if_stack.push(branch);
            }
            OpCode::Else => {
                let top = self
                    .if_stack
                    .last_mut()
                    .ok_or(ScriptFailure::UnbalancedConditional)?;
                *top = !*top;
            }
            OpCode::EndIf => {
                self.if_stack
                    .pop()
                    .ok_or(ScriptFailure::UnbalancedConditional)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn step(&mut self, op: OpCode) -> Step {
        use OpCode::*;
        match op {
            Op0 => self.push_num(ScriptNum::from(0i64))?,
            Op1Negate => self.push_num(ScriptNum::from(-1i64))?,
            Op1 | Op2 | Op3 | Op4 | Op5 | Op6 | Op7 | Op8 | Op9 | Op10 | Op11 | Op12 | Op13
            | Op14 | Op15 | Op16 => {
                let n = op.small_int().unwrap_or_default();
                self.push_num(ScriptNum::from(n as i64))?;
            }
            PushData1 | PushData2 | PushData4 => {
                return Err(ScriptFailure::UnknownOpcode(format!("{} without payload", op.name())))
            }

            // Control
            Verify => {
                if !cast_to_bool(&self.pop()?) {
                    return Err(ScriptFailure::VerifyFailed(op.name().to_string()));
                }
            }
            If | NotIf | Else | EndIf | Return => {}
            ToAltStack => {
                let item = self.pop()?;
                self.alt_stack.push(item);
            }
            FromAltStack => {
                let item = self.alt_stack.pop().ok_or(ScriptFailure::AltStackUnderflow)?;
                self.stack.push(item);
            }

            // Stack
            TwoDrop => {
                self.require(2)?;
                self.stack.truncate(self.stack.len() - 2);
            }
            TwoDup => self.copy_from_top(2, 2)?,
            ThreeDup => self.copy_from_top(3, 3)?,
            TwoOver => self.copy_from_top(4, 2)?,
            TwoRot => {
                self.require(6)?;
                let at = self.stack.len() - 6;
                let a = self.stack.remove(at);
                let b = self.stack.remove(at);
                self.stack.push(a);
                self.stack.push(b);
            }
            TwoSwap => {
                self.require(4)?;
                let len = self.stack.len();
                self.stack[len - 4..].rotate_left(2);
            }
            IfDup => {
                let top = self.peek(0)?.clone();
                if cast_to_bool(&top) {
                    self.stack.push(top);
                }
            }
            Depth => self.push_num(ScriptNum::from(self.stack.len() as u64))?,
            Drop => {
                self.pop()?;
            }
            Dup => self.copy_from_top(1, 1)?,
            Nip => {
                self.require(2)?;
                let at = self.stack.len() - 2;
                self.stack.remove(at);
            }
            Over => self.copy_from_top(2, 1)?,
            Pick | Roll => {
                let n = self.pop_index()?;
                if n >= self.stack.len() {
                    return Err(ScriptFailure::StackUnderflow);
                }
                let at = self.stack.len() - 1 - n;
                let item = if op == Pick {
                    self.stack[at].clone()
                } else {
                    self.stack.remove(at)
                };
                self.stack.push(item);
            }
            Rot => {
                self.require(3)?;
                let at = self.stack.len() - 3;
                let item = self.stack.remove(at);
                self.stack.push(item);
            }
            Swap => {
                self.require(2)?;
                let len = self.stack.len();
                self.stack.swap(len - 1, len - 2);
            }
            Tuck => {
                self.require(2)?;
                let top = self.peek(0)?.clone();
                let at = self.stack.len() - 2;
                self.stack.insert(at, top);
            }

            // Splice
            Cat => {
                let b = self.pop()?;
                let mut a = self.pop()?;
                if a.len() + b.len() > MAX_ELEMENT_SIZE {
                    return Err(ScriptFailure::ElementTooLarge(a.len() + b.len()));
                }
                a.extend_from_slice(&b);
                self.stack.push(a);
            }
            Substr => {
                let size = self.pop_index()?;
                let begin = self.pop_index()?;
                let data = self.pop()?;
                let end = begin.checked_add(size).ok_or(ScriptFailure::InvalidRange)?;
                let slice = data.get(begin..end).ok_or(ScriptFailure::InvalidRange)?;
                self.stack.push(slice.to_vec());
            }
            Left => {
                let n = self.pop_index()?;
                let data = self.pop()?;
                let slice = data.get(..n).ok_or(ScriptFailure::InvalidRange)?;
                self.stack.push(slice.to_vec());
            }
            Right => {
                let n = self.pop_index()?;
                let data = self.pop()?;
                let start = data.len().checked_sub(n).ok_or(ScriptFailure::InvalidRange)?;
                self.stack.push(data[start..].to_vec());
            }
            Size => {
                let len = self.peek(0)?.len();
                self.push_num(ScriptNum::from(len as u64))?;
            }

            // Bitwise
            Invert => {
                let data = self.pop()?;
                self.stack.push(data.iter().map(|b| !b).collect());
            }
            And | Or | Xor => {
                let b = self.pop()?;
                let a = self.pop()?;
                if a.len() != b.len() {
                    return Err(ScriptFailure::OperandSizeMismatch);
                }
                let combined = a
                    .iter()
                    .zip(&b)
                    .map(|(x, y)| match op {
                        And => x & y,
                        Or => x | y,
                        _ => x ^ y,
                    })
                    .collect();
                self.stack.push(combined);
            }
            Equal | EqualVerify => {
                let b = self.pop()?;
                let a = self.pop()?;
                if op == EqualVerify {
                    if a != b {
                        return Err(ScriptFailure::VerifyFailed(op.name().to_string()));
                    }
                } else {
                    self.push_bool(a == b)?;
                }
            }

            // Arithmetic
            Add1 | Sub1 | Mul2 | Div2 | Negate | Abs | Not | NotEqual0 => {
                let n = self.pop_num()?.0;
                let result = match op {
                    Add1 => n + 1,
                    Sub1 => n - 1,
                    Mul2 => n * 2,
                    Div2 => n / 2,
                    Negate => -n,
                    Abs => n.abs(),
                    Not => BigInt::from(n.is_zero() as u8),
                    _ => BigInt::from(!n.is_zero() as u8),
                };
                self.push_num(ScriptNum(result))?;
            }
            Add | Sub | Mul | Div | Mod | BoolAnd | BoolOr | NumEqual | NumEqualVerify
            | NumNotEqual | LessThan | GreaterThan | LessThanOrEqual | GreaterThanOrEqual | Min
            | Max => {
                let b = self.pop_num()?.0;
                let a = self.pop_num()?.0;
                let bool_num = |v: bool| BigInt::from(v as u8);
                let result = match op {
                    Add => a + b,
                    Sub => a - b,
                    Mul => a * b,
                    Div | Mod if b.is_zero() => return Err(ScriptFailure::DivisionByZero),
                    Div => a / b,
                    Mod => a % b,
                    BoolAnd => bool_num(!a.is_zero() && !b.is_zero()),
                    BoolOr => bool_num(!a.is_zero() || !b.is_zero()),
                    NumEqual | NumEqualVerify => bool_num(a == b),
                    NumNotEqual => bool_num(a != b),
                    LessThan => bool_num(a < b),
                    GreaterThan => bool_num(a > b),
                    LessThanOrEqual => bool_num(a <= b),
                    GreaterThanOrEqual => bool_num(a >= b),
                    Min => a.min(b),
                    _ => a.max(b),
                };
                if op == NumEqualVerify {
                    if result.is_zero() {
                        return Err(ScriptFailure::VerifyFailed(op.name().to_string()));
                    }
                } else {
                    self.push_num(ScriptNum(result))?;
                }
            }
            LShift | RShift => {
                let shift = self.pop_index()?;
                if shift > MAX_SHIFT_BITS {
                    return Err(ScriptFailure::InvalidRange);
                }
                let n = self.pop_num()?.0;
                let result = if op == LShift { n << shift } else { n >> shift };
                self.push_num(ScriptNum(result))?;
            }
            Within => {
                let max = self.pop_num()?.0;
                let min = self.pop_num()?.0;
                let x = self.pop_num()?.0;
                self.push_bool(min <= x && x < max)?;
            }

            // Hashing
            Blake3 => {
                let data = self.pop()?;
                self.stack.push(blake3_hash(&data).as_bytes().to_vec());
            }
            DoubleBlake3 => {
                let data = self.pop()?;
                self.stack.push(double_blake3_hash(&data).as_bytes().to_vec());
            }

            // Signatures
            CheckSig | CheckSigVerify => {
                let pubkey = self.pop()?;
                let sig = self.pop()?;
                let valid = self.check_sig(&sig, &pubkey)?;
                if op == CheckSigVerify {
                    if !valid {
                        return Err(ScriptFailure::VerifyFailed(op.name().to_string()));
                    }
                } else {
                    self.push_bool(valid)?;
                }
            }
            CheckMultiSig | CheckMultiSigVerify => {
                let valid = self.check_multisig()?;
                if op == CheckMultiSigVerify {
                    if !valid {
                        return Err(ScriptFailure::VerifyFailed(op.name().to_string()));
                    }
                } else {
                    self.push_bool(valid)?;
                }
            }

            // Locks
            CheckLockAbsVerify => {
                let ctx = self.context(op)?;
                let required = self.peek_lock()?;
                let actual = ctx.cache.tx().lock_abs as u64;
                if required > actual {
                    return Err(ScriptFailure::LockNotSatisfied { required, actual });
                }
            }
            CheckLockRelVerify => {
                let ctx = self.context(op)?;
                let required = self.peek_lock()?;
                let input = ctx
                    .cache
                    .tx()
                    .inputs
                    .get(ctx.input_index)
                    .ok_or_else(|| ScriptFailure::NoTxContext("input index out of range".to_string()))?;
                let actual = input.lock_rel as u64;
                if required > actual {
                    return Err(ScriptFailure::LockNotSatisfied { required, actual });
                }
            }
        }
        Ok(())
    }

    fn context(&self, op: OpCode) -> Result<SpendContext<'a>, ScriptFailure> {
        self.context
            .ok_or_else(|| ScriptFailure::NoTxContext(format!("{} needs a transaction", op.name())))
    }

    fn check_sig(&self, sig: &[u8], pubkey: &[u8]) -> Result<bool, ScriptFailure> {
        let ctx = self.context(OpCode::CheckSig)?;
        let signature = TxSignature::from_bytes(sig)
            .map_err(|e| ScriptFailure::InvalidSignature(e.to_string()))?;
        let pubkey = PubKeyBuf::from_slice(pubkey).map_err(|_| ScriptFailure::InvalidPubKey)?;
        ctx.cache
            .verify(
                ctx.scheme,
                ctx.input_index,
                &pubkey,
                &signature,
                self.script_code.get_or_init(|| self.script.to_bytes()),
                ctx.amount,
            )
            .map_err(|e| ScriptFailure::NoTxContext(e.to_string()))
    }

    /// `<sig>... m <pubkey>... n` with signatures in key order
    fn check_multisig(&mut self) -> Result<bool, ScriptFailure> {
        let n_keys = self.pop_index()?;
        if n_keys > MAX_MULTISIG_KEYS {
            return Err(ScriptFailure::InvalidRange);
        }
        let mut pubkeys = self.pop_many(n_keys)?;
        pubkeys.reverse();

        let n_sigs = self.pop_index()?;
        if n_sigs > n_keys {
            return Err(ScriptFailure::InvalidRange);
        }
        let mut sigs = self.pop_many(n_sigs)?;
        sigs.reverse();

        let mut keys = pubkeys.iter();
        for sig in &sigs {
            let matched = loop {
                match keys.next() {
                    Some(pubkey) if self.check_sig(sig, pubkey)? => break true,
                    Some(_) => continue,
                    None => break false,
                }
            };
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn peek_lock(&self) -> Result<u64, ScriptFailure> {
        let top = self.peek(0)?;
        ScriptNum::from_bytes(top)
            .and_then(|n| n.to_u64())
            .map_err(|e| ScriptFailure::InvalidNumber(e.to_string()))
    }

    fn require(&self, n: usize) -> Step {
        if self.stack.len() < n {
            return Err(ScriptFailure::StackUnderflow);
        }
        Ok(())
    }

    fn peek(&self, depth: usize) -> Result<&Vec<u8>, ScriptFailure> {
        self.require(depth + 1)?;
        Ok(&self.stack[self.stack.len() - 1 - depth])
    }

    fn pop(&mut self) -> Result<Vec<u8>, ScriptFailure> {
        self.stack.pop().ok_or(ScriptFailure::StackUnderflow)
    }

    fn pop_many(&mut self, n: usize) -> Result<Vec<Vec<u8>>, ScriptFailure> {
        self.require(n)?;
        Ok((0..n).filter_map(|_| self.stack.pop()).collect())
    }

    fn pop_num(&mut self) -> Result<ScriptNum, ScriptFailure> {
        let bytes = self.pop()?;
        ScriptNum::from_bytes(&bytes).map_err(|e| ScriptFailure::InvalidNumber(e.to_string()))
    }

    fn pop_index(&mut self) -> Result<usize, ScriptFailure> {
        let num = self.pop_num()?;
        if num.0.is_negative() {
            return Err(ScriptFailure::InvalidRange);
        }
        num.to_usize()
            .map_err(|e| ScriptFailure::InvalidNumber(e.to_string()))
    }

    /// Copy `count` items starting `depth` items below the top
    fn copy_from_top(&mut self, depth: usize, count: usize) -> Step {
        self.require(depth)?;
        let start = self.stack.len() - depth;
        let items: Vec<Vec<u8>> = self.stack[start..start + count].to_vec();
        self.stack.extend(items);
        Ok(())
    }

    fn push(&mut self, item: Vec<u8>) -> Step {
        if item.len() > MAX_ELEMENT_SIZE {
            return Err(ScriptFailure::ElementTooLarge(item.len()));
        }
        self.stack.push(item);
        Ok(())
    }

    fn push_num(&mut self, num: ScriptNum) -> Step {
        self.push(num.to_bytes())
    }

    fn push_bool(&mut self, value: bool) -> Step {
        self.push_num(ScriptNum::from(value))
    }

    fn check_depth(&self) -> Step {
        if self.stack.len() + self.alt_stack.len() > MAX_STACK_DEPTH {
            return Err(ScriptFailure::StackOverflow(MAX_STACK_DEPTH));
        }
        Ok(())
    }
}

/// Evaluate a script with no transaction context
pub fn eval_standalone(script: &Script) -> ScriptOutcome {
    Interpreter::standalone(script).evaluate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        pubkey_hash, Hash256, PrivKey, Secp256k1Scheme, SighashType, Tx, TxIn, TxOut,
    };

    fn run(text: &str) -> ScriptOutcome {
        eval_standalone(&Script::from_text(text).unwrap())
    }

    fn assert_success(text: &str) {
        let outcome = run(text);
        assert!(outcome.is_success(), "{}: {:?}", text, outcome);
    }

    fn assert_failure(text: &str, reason: ScriptFailure) {
        assert_eq!(run(text).failure(), Some(&reason), "{}", text);
    }

    #[test]
    fn test_zero_fails_with_zero_top() {
        let outcome = run("0");
        assert!(!outcome.is_success());
        assert_eq!(outcome.return_value(), Some(&[0u8][..]));
        assert_eq!(outcome.failure(), Some(&ScriptFailure::FalseStackTop));
    }

    #[test]
    fn test_push_ff_succeeds() {
        let outcome = run("0xff");
        assert!(outcome.is_success());
        assert_eq!(outcome.return_value(), Some(&[0xffu8][..]));
    }

    #[test]
    fn test_cast_to_bool() {
        assert!(!cast_to_bool(&[]));
        assert!(!cast_to_bool(&[0, 0, 0]));
        assert!(cast_to_bool(&[0, 1]));
        assert!(cast_to_bool(&[0x80]));
    }

    #[test]
    fn test_empty_script_fails() {
        assert_failure("", ScriptFailure::EmptyStack);
    }

    #[test]
    fn test_small_ints() {
        let outcome = run("16");
        assert_eq!(outcome.return_value(), Some(&[0x10u8][..]));
        let outcome = run("1NEGATE");
        assert_eq!(outcome.return_value(), Some(&[0xffu8][..]));
    }

    #[test]
    fn test_conditionals() {
        assert_eq!(run("1 IF 0x0a ELSE 0x0b ENDIF").return_value(), Some(&[0x0au8][..]));
        assert_eq!(run("0 IF 0x0a ELSE 0x0b ENDIF").return_value(), Some(&[0x0bu8][..]));
        assert_eq!(run("0 NOTIF 0x0a ELSE 0x0b ENDIF").return_value(), Some(&[0x0au8][..]));
        assert_eq!(
            run("1 IF 0 IF 0x01 ELSE 0x02 ENDIF ENDIF").return_value(),
            Some(&[0x02u8][..])
        );
        // Skipped branch ignores unknown work
        assert_success("0 IF VERIFY VERIFY ENDIF 1");
    }

    #[test]
    fn test_unbalanced_conditionals() {
        assert_failure("1 IF 1", ScriptFailure::UnbalancedConditional);
        assert_failure("1 ENDIF", ScriptFailure::UnbalancedConditional);
        assert_failure("1 ELSE", ScriptFailure::UnbalancedConditional);
        assert_failure("IF 1 ENDIF", ScriptFailure::StackUnderflow);
    }

    #[test]
    fn test_verify_and_return() {
        assert_failure("0 VERIFY 1", ScriptFailure::VerifyFailed("VERIFY".to_string()));
        assert_success("1 VERIFY 1");
        // RETURN stops scanning; the rest is never run
        assert_success("1 RETURN 0");
        assert_failure("0 RETURN 1", ScriptFailure::FalseStackTop);
    }

    #[test]
    fn test_unknown_opcode_at_runtime() {
        let script = Script::from_bytes(&[0x51, 0xb0]).unwrap();
        let outcome = eval_standalone(&script);
        assert!(matches!(outcome.failure(), Some(ScriptFailure::UnknownOpcode(_))));
        assert_eq!(outcome.return_value(), Some(&[0x01u8][..]));
    }

    #[test]
    fn test_stack_ops() {
        assert_success("1 2 SWAP 1 EQUALVERIFY 2 EQUAL");
        assert_success("1 2 3 ROT 1 EQUALVERIFY 3 EQUALVERIFY 2 EQUAL");
        assert_success("1 2 OVER 1 EQUALVERIFY 2 EQUALVERIFY 1 EQUAL");
        assert_success("1 2 NIP 2 EQUAL");
        assert_success("1 2 TUCK 2 EQUALVERIFY 1 EQUALVERIFY 2 EQUAL");
        assert_success("5 6 7 2 PICK 5 EQUALVERIFY DEPTH 3 EQUAL");
        assert_success("5 6 7 2 ROLL 5 EQUALVERIFY DEPTH 2 EQUAL");
        assert_success("1 2 2DUP DEPTH 4 EQUALVERIFY 2DROP 2 EQUAL");
        assert_success("1 2 3 3DUP DEPTH 6 EQUAL");
        assert_success("1 2 3 4 2SWAP 2 EQUALVERIFY 1 EQUALVERIFY 4 EQUALVERIFY 3 EQUAL");
        assert_success("1 2 3 4 2OVER 2 EQUALVERIFY 1 EQUAL");
        assert_success("1 2 3 4 5 6 2ROT 2 EQUALVERIFY 1 EQUAL");
        assert_success("0 IFDUP DEPTH 1 EQUAL");
        assert_success("7 TOALTSTACK FROMALTSTACK 7 EQUAL");
        assert_failure("FROMALTSTACK", ScriptFailure::AltStackUnderflow);
        assert_failure("DUP", ScriptFailure::StackUnderflow);
        assert_failure("1 2 ROLL", ScriptFailure::StackUnderflow);
    }

    #[test]
    fn test_splice_and_bitwise() {
        assert_success("0x0102 0x0304 CAT 0x01020304 EQUAL");
        assert_success("0x0102030405 1 2 SUBSTR 0x0203 EQUAL");
        assert_success("0x010203 2 LEFT 0x0102 EQUAL");
        assert_success("0x010203 2 RIGHT 0x0203 EQUAL");
        assert_success("0x010203 SIZE 3 EQUALVERIFY 0x010203 EQUAL");
        assert_failure("0x0102 3 LEFT", ScriptFailure::InvalidRange);
        assert_success("0x0f INVERT 0xf0 EQUAL");
        assert_success("0x0ff0 0x00ff AND 0x00f0 EQUAL");
        assert_success("0x0ff0 0x00ff OR 0x0fff EQUAL");
        assert_success("0x0ff0 0x00ff XOR 0x0f0f EQUAL");
        assert_failure("0x01 0x0102 AND", ScriptFailure::OperandSizeMismatch);
    }

    #[test]
    fn test_arithmetic() {
        assert_success("2 3 ADD 5 NUMEQUAL");
        assert_success("2 3 SUB 1NEGATE NUMEQUAL");
        assert_success("4 5 MUL 0x14 NUMEQUAL");
        assert_success("9 2 DIV 4 NUMEQUAL");
        assert_success("9 2 MOD 1 NUMEQUAL");
        assert_success("5 1ADD 6 NUMEQUALVERIFY 5 1SUB 4 NUMEQUAL");
        assert_success("5 2MUL 10 NUMEQUALVERIFY 5 2DIV 2 NUMEQUAL");
        assert_success("5 NEGATE ABS 5 NUMEQUAL");
        assert_success("0 NOT 5 0NOTEQUAL BOOLAND");
        assert_success("0 1 BOOLOR");
        assert_success("1 2 LESSTHAN 2 1 GREATERTHAN BOOLAND");
        assert_success("2 2 LESSTHANOREQUAL 2 2 GREATERTHANOREQUAL BOOLAND");
        assert_success("3 7 MIN 3 NUMEQUALVERIFY 3 7 MAX 7 NUMEQUAL");
        assert_success("5 3 7 WITHIN");
        assert_failure("7 3 7 WITHIN", ScriptFailure::FalseStackTop);
        assert_success("1 8 LSHIFT 0x0100 NUMEQUAL");
        assert_success("0x0100 8 RSHIFT 1 NUMEQUAL");
        assert_success("1 2 NUMNOTEQUAL");
        assert_failure("1 0 DIV", ScriptFailure::DivisionByZero);
        assert_failure("1 0 MOD", ScriptFailure::DivisionByZero);
        assert!(matches!(
            run("0x0001 1 ADD").failure(),
            Some(ScriptFailure::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_arbitrary_precision() {
        // 2^64 + 2^64 = 2^65
        assert_success("0x010000000000000000 DUP ADD 0x020000000000000000 NUMEQUAL");
    }

    #[test]
    fn test_hashing() {
        let data = [0xab, 0xcd];
        let script = format!(
            "0xabcd DUP BLAKE3 0x{} EQUALVERIFY DOUBLEBLAKE3 0x{} EQUAL",
            blake3_hash(&data).to_hex(),
            double_blake3_hash(&data).to_hex()
        );
        assert_success(&script);
    }

    #[test]
    fn test_op_limit() {
        let script = Script::from_text(&"1 DROP ".repeat(10)).unwrap();
        let mut interp = Interpreter::new(&script, vec![vec![1]], None, 5);
        assert_eq!(interp.execute(), Err(ScriptFailure::OpLimitExceeded(5)));
        assert_eq!(interp.op_count(), 6);
    }

    #[test]
    fn test_pick_roll_huge_index() {
        assert_failure("1 0x00ffffffffffffffff PICK", ScriptFailure::StackUnderflow);
        assert_failure("1 0x00ffffffffffffffff ROLL", ScriptFailure::StackUnderflow);
        assert_failure("1 2 2 PICK", ScriptFailure::StackUnderflow);
    }

    #[test]
    fn test_element_size_limit() {
        let doubling = format!("0xff{}", " DUP CAT".repeat(24));
        assert!(matches!(run(&doubling).failure(), Some(ScriptFailure::ElementTooLarge(_))));

        // 2^4095 needs 513 bytes; squaring it past the limit fails instead of allocating
        let squaring = format!("1 0x0fff LSHIFT{}", " DUP MUL".repeat(8));
        assert!(matches!(run(&squaring).failure(), Some(ScriptFailure::ElementTooLarge(_))));

        let oversized = Script::from_text(&format!("0x{}", "01".repeat(MAX_ELEMENT_SIZE + 1))).unwrap();
        assert_eq!(
            eval_standalone(&oversized).failure(),
            Some(&ScriptFailure::ElementTooLarge(MAX_ELEMENT_SIZE + 1))
        );
        let largest = Script::from_text(&format!("0x{}", "01".repeat(MAX_ELEMENT_SIZE))).unwrap();
        assert!(eval_standalone(&largest).is_success());
    }

    #[test]
    fn test_stack_depth_limit() {
        let script = Script::from_text(&"1 ".repeat(MAX_STACK_DEPTH + 1)).unwrap();
        assert_eq!(
            eval_standalone(&script).failure(),
            Some(&ScriptFailure::StackOverflow(MAX_STACK_DEPTH))
        );
        let script = Script::from_text(&format!("1{}", " DUP".repeat(MAX_STACK_DEPTH))).unwrap();
        assert_eq!(
            eval_standalone(&script).failure(),
            Some(&ScriptFailure::StackOverflow(MAX_STACK_DEPTH))
        );
    }

    #[test]
    fn test_checksig_without_context() {
        let outcome = run(&format!("0x{} 0x{} CHECKSIG", "00".repeat(65), "02".repeat(33)));
        assert!(matches!(outcome.failure(), Some(ScriptFailure::NoTxContext(_))));
    }

    struct Fixture {
        tx: Tx,
        prev_output: TxOut,
        privkeys: Vec<PrivKey>,
        pubkeys: Vec<PubKeyBuf>,
        scheme: Secp256k1Scheme,
    }

    fn fixture(output_script: impl Fn(&[PubKeyBuf]) -> Script) -> Fixture {
        let scheme = Secp256k1Scheme::new();
        let privkeys: Vec<PrivKey> = (1..=3).map(|b| PrivKey([b; 32])).collect();
        let pubkeys: Vec<PubKeyBuf> = privkeys
            .iter()
            .map(|k| scheme.public_key(k).unwrap())
            .collect();
        let prev_output = TxOut::new(5000, output_script(&pubkeys));
        let tx = Tx::new(
            0,
            vec![TxIn::new(Hash256::new([9; 32]), 0, Script::empty(), 50)],
            vec![TxOut::new(4000, Script::empty())],
            10,
        );
        Fixture {
            tx,
            prev_output,
            privkeys,
            pubkeys,
            scheme,
        }
    }

    fn sign(f: &Fixture, key: usize) -> Vec<u8> {
        HashCache::new(&f.tx)
            .sign(
                &f.scheme,
                0,
                &f.privkeys[key],
                &f.prev_output.script.to_bytes(),
                f.prev_output.value,
                SighashType::ALL,
            )
            .unwrap()
            .to_bytes()
    }

    fn eval_with(f: &Fixture, stack: Vec<Vec<u8>>, amount: u64) -> ScriptOutcome {
        let cache = HashCache::new(&f.tx);
        let ctx = SpendContext {
            cache: &cache,
            input_index: 0,
            amount,
            scheme: &f.scheme,
        };
        Interpreter::new(&f.prev_output.script, stack, Some(ctx), MAX_SCRIPT_OPS).evaluate()
    }

    #[test]
    fn test_pkh_spend() {
        let f = fixture(|keys| Script::pkh_output(&pubkey_hash(keys[0].as_bytes())));
        let sig = sign(&f, 0);
        let good = eval_with(&f, vec![sig.clone(), f.pubkeys[0].0.to_vec()], 5000);
        assert!(good.is_success(), "{:?}", good);

        // Signed amount differs from the spent amount
        let wrong_amount = eval_with(&f, vec![sig.clone(), f.pubkeys[0].0.to_vec()], 4999);
        assert_eq!(wrong_amount.failure(), Some(&ScriptFailure::FalseStackTop));

        // Key does not match the committed hash
        let wrong_key = eval_with(&f, vec![sign(&f, 1), f.pubkeys[1].0.to_vec()], 5000);
        assert_eq!(
            wrong_key.failure(),
            Some(&ScriptFailure::VerifyFailed("EQUALVERIFY".to_string()))
        );

        let bad_sig = eval_with(&f, vec![vec![1, 2, 3], f.pubkeys[0].0.to_vec()], 5000);
        assert!(matches!(bad_sig.failure(), Some(ScriptFailure::InvalidSignature(_))));
    }

    #[test]
    fn test_multisig() {
        let f = fixture(|keys| {
            let mut text = String::from("2");
            for key in keys {
                text.push_str(&format!(" 0x{}", key.to_hex()));
            }
            text.push_str(" 3 CHECKMULTISIG");
            Script::from_text(&text).unwrap()
        });
        let ok = eval_with(&f, vec![sign(&f, 0), sign(&f, 2)], 5000);
        assert!(ok.is_success(), "{:?}", ok);

        // Signatures out of key order do not match
        let swapped = eval_with(&f, vec![sign(&f, 2), sign(&f, 0)], 5000);
        assert_eq!(swapped.failure(), Some(&ScriptFailure::FalseStackTop));

        let missing = eval_with(&f, vec![sign(&f, 0)], 5000);
        assert_eq!(missing.failure(), Some(&ScriptFailure::StackUnderflow));
    }

    #[test]
    fn test_lock_opcodes() {
        let f = fixture(|_| Script::from_text("10 CHECKLOCKABSVERIFY DROP 0x32 CHECKLOCKRELVERIFY").unwrap());
        assert!(eval_with(&f, vec![], 0).is_success());

        let f = fixture(|_| Script::from_text("11 CHECKLOCKABSVERIFY").unwrap());
        assert_eq!(
            eval_with(&f, vec![], 0).failure(),
            Some(&ScriptFailure::LockNotSatisfied { required: 11, actual: 10 })
        );

        let f = fixture(|_| Script::from_text("0x33 CHECKLOCKRELVERIFY").unwrap());
        assert_eq!(
            eval_with(&f, vec![], 0).failure(),
            Some(&ScriptFailure::LockNotSatisfied { required: 51, actual: 50 })
        );
    }

    #[test]
    fn test_expired_pkhx_spend() {
        let f = fixture(|keys| Script::pkhx_output(&pubkey_hash(keys[0].as_bytes()), 50).unwrap());
        // Anyone can spend with "0" once the relative lock has passed
        let expired = eval_with(&f, vec![vec![0]], 0);
        assert!(expired.is_success(), "{:?}", expired);

        // Owner can still spend with a signature
        let sig = sign(&f, 0);
        assert!(eval_with(&f, vec![sig, f.pubkeys[0].0.to_vec()], 5000).is_success());

        let f = fixture(|keys| Script::pkhx_output(&pubkey_hash(keys[0].as_bytes()), 51).unwrap());
        assert!(matches!(
            eval_with(&f, vec![vec![0]], 0).failure(),
            Some(ScriptFailure::LockNotSatisfied { .. })
        ));
    }
}
