// Opcode table

use crate::error::{Error, Result};

macro_rules! opcodes {
    ($($variant:ident = $byte:literal => $name:literal,)*) => {
        /// Script opcodes
        ///
        /// Bytes `0x01..=0x4b` are direct pushes and have no variant; see
        /// [`OpCode::is_direct_push`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum OpCode {
            $($variant = $byte,)*
        }

        impl OpCode {
            /// Convert byte to opcode
            pub fn from_byte(byte: u8) -> Option<Self> {
                match byte {
                    $($byte => Some(OpCode::$variant),)*
                    _ => None,
                }
            }

            /// Text-form name
            pub fn name(self) -> &'static str {
                match self {
                    $(OpCode::$variant => $name,)*
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(OpCode::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

opcodes! {
    Op0 = 0x00 => "0",
    PushData1 = 0x4c => "PUSHDATA1",
    PushData2 = 0x4d => "PUSHDATA2",
    PushData4 = 0x4e => "PUSHDATA4",
    Op1Negate = 0x4f => "1NEGATE",
    Op1 = 0x51 => "1",
    Op2 = 0x52 => "2",
    Op3 = 0x53 => "3",
    Op4 = 0x54 => "4",
    Op5 = 0x55 => "5",
    Op6 = 0x56 => "6",
    Op7 = 0x57 => "7",
    Op8 = 0x58 => "8",
    Op9 = 0x59 => "9",
    Op10 = 0x5a => "10",
    Op11 = 0x5b => "11",
    Op12 = 0x5c => "12",
    Op13 = 0x5d => "13",
    Op14 = 0x5e => "14",
    Op15 = 0x5f => "15",
    Op16 = 0x60 => "16",
    If = 0x63 => "IF",
    NotIf = 0x64 => "NOTIF",
    Else = 0x67 => "ELSE",
    EndIf = 0x68 => "ENDIF",
    Verify = 0x69 => "VERIFY",
    Return = 0x6a => "RETURN",
    ToAltStack = 0x6b => "TOALTSTACK",
    FromAltStack = 0x6c => "FROMALTSTACK",
    TwoDrop = 0x6d => "2DROP",
    TwoDup = 0x6e => "2DUP",
    ThreeDup = 0x6f => "3DUP",
    TwoOver = 0x70 => "2OVER",
    TwoRot = 0x71 => "2ROT",
    TwoSwap = 0x72 => "2SWAP",
    IfDup = 0x73 => "IFDUP",
    Depth = 0x74 => "DEPTH",
    Drop = 0x75 => "DROP",
    Dup = 0x76 => "DUP",
    Nip = 0x77 => "NIP",
    Over = 0x78 => "OVER",
    Pick = 0x79 => "PICK",
    Roll = 0x7a => "ROLL",
    Rot = 0x7b => "ROT",
    Swap = 0x7c => "SWAP",
    Tuck = 0x7d => "TUCK",
    Cat = 0x7e => "CAT",
    Substr = 0x7f => "SUBSTR",
    Left = 0x80 => "LEFT",
    Right = 0x81 => "RIGHT",
    Size = 0x82 => "SIZE",
    Invert = 0x83 => "INVERT",
    And = 0x84 => "AND",
    Or = 0x85 => "OR",
    Xor = 0x86 => "XOR",
    Equal = 0x87 => "EQUAL",
    EqualVerify = 0x88 => "EQUALVERIFY",
    Add1 = 0x8b => "1ADD",
    Sub1 = 0x8c => "1SUB",
    Mul2 = 0x8d => "2MUL",
    Div2 = 0x8e => "2DIV",
    Negate = 0x8f => "NEGATE",
    Abs = 0x90 => "ABS",
    Not = 0x91 => "NOT",
    NotEqual0 = 0x92 => "0NOTEQUAL",
    Add = 0x93 => "ADD",
    Sub = 0x94 => "SUB",
    Mul = 0x95 => "MUL",
    Div = 0x96 => "DIV",
    Mod = 0x97 => "MOD",
    LShift = 0x98 => "LSHIFT",
    RShift = 0x99 => "RSHIFT",
    BoolAnd = 0x9a => "BOOLAND",
    BoolOr = 0x9b => "BOOLOR",
    NumEqual = 0x9c => "NUMEQUAL",
    NumEqualVerify = 0x9d => "NUMEQUALVERIFY",
    NumNotEqual = 0x9e => "NUMNOTEQUAL",
    LessThan = 0x9f => "LESSTHAN",
    GreaterThan = 0xa0 => "GREATERTHAN",
    LessThanOrEqual = 0xa1 => "LESSTHANOREQUAL",
    GreaterThanOrEqual = 0xa2 => "GREATERTHANOREQUAL",
    Min = 0xa3 => "MIN",
    Max = 0xa4 => "MAX",
    Within = 0xa5 => "WITHIN",
    Blake3 = 0xa6 => "BLAKE3",
    DoubleBlake3 = 0xa7 => "DOUBLEBLAKE3",
    CheckSig = 0xac => "CHECKSIG",
    CheckSigVerify = 0xad => "CHECKSIGVERIFY",
    CheckMultiSig = 0xae => "CHECKMULTISIG",
    CheckMultiSigVerify = 0xaf => "CHECKMULTISIGVERIFY",
    CheckLockAbsVerify = 0xb1 => "CHECKLOCKABSVERIFY",
    CheckLockRelVerify = 0xb2 => "CHECKLOCKRELVERIFY",
}

/// Largest direct-push opcode
pub const MAX_DIRECT_PUSH: u8 = 0x4b;

impl OpCode {
    pub fn is_direct_push(byte: u8) -> bool {
        (0x01..=MAX_DIRECT_PUSH).contains(&byte)
    }

    /// Opcodes that carry a payload
    pub fn is_push_data(byte: u8) -> bool {
        Self::is_direct_push(byte)
            || byte == OpCode::PushData1 as u8
            || byte == OpCode::PushData2 as u8
            || byte == OpCode::PushData4 as u8
    }

    /// Value pushed by `1`..`16`, if this is a small-integer opcode
    pub fn small_int(self) -> Option<u8> {
        let byte = self as u8;
        (OpCode::Op1 as u8..=OpCode::Op16 as u8)
            .contains(&byte)
            .then(|| byte - OpCode::Op1 as u8 + 1)
    }

    pub fn from_small_int(n: u8) -> Result<Self> {
        match n {
            0 => Ok(OpCode::Op0),
            1..=16 => OpCode::from_byte(OpCode::Op1 as u8 + n - 1)
                .ok_or_else(|| Error::InvalidOpcode(format!("small int {}", n))),
            _ => Err(Error::InvalidOpcode(format!("small int {} out of range", n))),
        }
    }

    pub fn is_conditional(self) -> bool {
        matches!(self, OpCode::If | OpCode::NotIf | OpCode::Else | OpCode::EndIf)
    }
}

/// Display name for any opcode byte, including direct pushes
pub fn opcode_name(byte: u8) -> String {
    match OpCode::from_byte(byte) {
        Some(op) => op.name().to_string(),
        None if OpCode::is_direct_push(byte) => format!("PUSHBYTES{}", byte),
        None => format!("UNKNOWN({:#04x})", byte),
    }
}
