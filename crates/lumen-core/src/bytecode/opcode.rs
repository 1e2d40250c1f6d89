//! Instruction set. One byte per opcode, followed by a fixed number of
//! operand bytes that depends on the opcode only.

use core::fmt;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::CoreError;

/// Straight-line arithmetic instruction set.
///
/// The discriminants are the wire encoding; changing them requires bumping
/// [`BYTECODE_VERSION`](crate::BYTECODE_VERSION).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[repr(u8)]
pub enum OpCode {
    /// `CONSTANT idx` : push `constants[idx]`.
    Constant = 0,
    /// Pop `b`, pop `a`, push `a + b`.
    Add = 1,
    /// Pop `b`, pop `a`, push `a - b`.
    Subtract = 2,
    /// Pop `b`, pop `a`, push `a * b`.
    Multiply = 3,
    /// Pop `b`, pop `a`, push `a / b` (IEEE-754, no trap on zero).
    Divide = 4,
    /// Pop `v`, push `-v`.
    Negate = 5,
    /// Halt; the top of stack, if any, is the result.
    Return = 6,
}

impl OpCode {
    /// Every opcode, in encoding order.
    pub const ALL: [OpCode; 7] = [
        OpCode::Constant,
        OpCode::Add,
        OpCode::Subtract,
        OpCode::Multiply,
        OpCode::Divide,
        OpCode::Negate,
        OpCode::Return,
    ];

    /// Decode a byte found at dispatch position.
    pub const fn decode(byte: u8) -> Option<OpCode> {
        match byte {
            0 => Some(OpCode::Constant),
            1 => Some(OpCode::Add),
            2 => Some(OpCode::Subtract),
            3 => Some(OpCode::Multiply),
            4 => Some(OpCode::Divide),
            5 => Some(OpCode::Negate),
            6 => Some(OpCode::Return),
            _ => None,
        }
    }

    /// Number of operand bytes following the opcode.
    pub const fn operand_count(self) -> usize {
        match self {
            OpCode::Constant => 1,
            _ => 0,
        }
    }

    /// Total encoded size (opcode + operands).
    pub const fn width(self) -> usize { 1 + self.operand_count() }

    /// Minimum operand-stack depth required before execution.
    pub const fn stack_inputs(self) -> usize {
        match self {
            OpCode::Add | OpCode::Subtract | OpCode::Multiply | OpCode::Divide => 2,
            OpCode::Negate => 1,
            OpCode::Constant | OpCode::Return => 0,
        }
    }

    /// Disassembly name.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Constant => "OP_CONSTANT",
            OpCode::Add => "OP_ADD",
            OpCode::Subtract => "OP_SUBTRACT",
            OpCode::Multiply => "OP_MULTIPLY",
            OpCode::Divide => "OP_DIVIDE",
            OpCode::Negate => "OP_NEGATE",
            OpCode::Return => "OP_RETURN",
        }
    }

    /// Parse a mnemonic, with or without the `OP_` prefix, ignoring case.
    pub fn from_mnemonic(name: &str) -> Option<OpCode> {
        let upper = name.to_ascii_uppercase();
        let bare = upper.strip_prefix("OP_").unwrap_or(&upper);
        OpCode::ALL.into_iter().find(|op| &op.mnemonic()[3..] == bare)
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> u8 { op as u8 }
}

impl TryFrom<u8> for OpCode {
    type Error = CoreError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        OpCode::decode(byte).ok_or(CoreError::InvalidOpcode { byte })
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.mnemonic()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_matches_discriminants() {
        for op in OpCode::ALL {
            assert_eq!(OpCode::decode(op as u8), Some(op));
            assert_eq!(OpCode::try_from(u8::from(op)), Ok(op));
        }
        assert_eq!(OpCode::decode(7), None);
        assert_eq!(OpCode::try_from(0xFF), Err(CoreError::InvalidOpcode { byte: 0xFF }));
    }

    #[test]
    fn widths() {
        assert_eq!(OpCode::Constant.width(), 2);
        assert_eq!(OpCode::Add.width(), 1);
        assert_eq!(OpCode::Return.width(), 1);
    }

    #[test]
    fn mnemonics() {
        assert_eq!(OpCode::from_mnemonic("add"), Some(OpCode::Add));
        assert_eq!(OpCode::from_mnemonic("OP_NEGATE"), Some(OpCode::Negate));
        assert_eq!(OpCode::from_mnemonic("op_return"), Some(OpCode::Return));
        assert_eq!(OpCode::from_mnemonic("JUMP"), None);
        assert_eq!(OpCode::Divide.to_string(), "OP_DIVIDE");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_as_variant_name() {
        assert_eq!(serde_json::to_string(&OpCode::Multiply).unwrap(), "\"Multiply\"");
    }
}
