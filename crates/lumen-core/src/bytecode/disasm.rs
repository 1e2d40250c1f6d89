//! Textual disassembly. Read-only: never touches the chunk it is given.
//!
//! Output format, one line per instruction:
//!
//! ```text
//! == test chunk ==
//! 0000  123 OP_CONSTANT         0 '1.2'
//! 0002    | OP_ADD
//! ```
//!
//! The second column is the source line, or `|` when unchanged from the
//! previous byte.

use core::fmt::Write;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::bytecode::{
    chunk::Chunk,
    cursor::{Cursor, DecodeError},
    opcode::OpCode,
    value::{format_value, Value},
};

/// One decoded instruction, as listed by the disassembler.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Instruction {
    /// Offset of the opcode byte.
    pub offset: usize,
    /// Source line of the opcode byte.
    pub line: u32,
    /// Raw opcode byte.
    pub byte: u8,
    /// Decoded opcode (`None` for an unknown byte).
    pub opcode: Option<OpCode>,
    /// Operand byte, for opcodes that take one.
    pub operand: Option<u8>,
    /// Resolved constant for `OP_CONSTANT`.
    pub constant: Option<Value>,
    /// Decoding problem, if any.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub error: Option<String>,
    /// Offset of the following instruction.
    pub next: usize,
}

/// Decode the instruction starting at `offset`.
///
/// Unknown opcodes consume one byte; a truncated operand consumes the rest of
/// the chunk.
pub fn decode_at(chunk: &Chunk, offset: usize) -> Instruction {
    let mut cur = Cursor::at(chunk, offset);
    let byte = chunk.code().get(offset).copied().unwrap_or_default();
    let mut ins = Instruction {
        offset,
        line: chunk.line_at(offset).unwrap_or_default(),
        byte,
        opcode: None,
        operand: None,
        constant: None,
        error: None,
        next: offset + 1,
    };

    match cur.read_opcode() {
        Ok(OpCode::Constant) => {
            ins.opcode = Some(OpCode::Constant);
            match cur.read_constant() {
                Ok((index, value)) => {
                    ins.operand = Some(index);
                    ins.constant = Some(value);
                }
                Err(e @ DecodeError::ConstantOutOfRange { index, .. }) => {
                    ins.operand = Some(index);
                    ins.error = Some(e.to_string());
                }
                Err(e) => ins.error = Some(e.to_string()),
            }
            ins.next = cur.offset();
        }
        Ok(op) => {
            ins.opcode = Some(op);
            ins.next = cur.offset();
        }
        Err(e) => ins.error = Some(e.to_string()),
    }
    ins
}

/// Offsets of every instruction, in order.
pub fn instruction_offsets(chunk: &Chunk) -> impl Iterator<Item = usize> + '_ {
    let mut offset = 0;
    core::iter::from_fn(move || {
        if offset >= chunk.len() {
            return None;
        }
        let current = offset;
        offset = decode_at(chunk, offset).next;
        Some(current)
    })
}

/// Every instruction of the chunk, decoded.
pub fn listing(chunk: &Chunk) -> Vec<Instruction> {
    instruction_offsets(chunk).map(|offset| decode_at(chunk, offset)).collect()
}

/// Disassemble the whole chunk under a `== name ==` header.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {name} ==");
    let mut offset = 0;
    while offset < chunk.len() {
        offset = disassemble_instruction(chunk, offset, &mut out);
    }
    out
}

/// Append the instruction at `offset` to `out` and return the next offset.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let ins = decode_at(chunk, offset);
    render(chunk, &ins, out);
    ins.next
}

fn render(chunk: &Chunk, ins: &Instruction, out: &mut String) {
    let _ = write!(out, "{:04} ", ins.offset);
    if ins.offset > 0 && chunk.line_at(ins.offset - 1) == Some(ins.line) {
        out.push_str("   | ");
    } else {
        let _ = write!(out, "{:4} ", ins.line);
    }

    match (ins.opcode, ins.operand, ins.constant) {
        (Some(op @ OpCode::Constant), Some(index), Some(value)) => {
            let _ = writeln!(out, "{:<16} {index:4} '{}'", op.mnemonic(), format_value(value));
        }
        (Some(op @ OpCode::Constant), Some(index), None) => {
            let _ = writeln!(out, "{:<16} {index:4} <out of range>", op.mnemonic());
        }
        (Some(op @ OpCode::Constant), None, _) => {
            let _ = writeln!(out, "{:<16} <missing operand>", op.mnemonic());
        }
        (Some(op), _, _) => {
            let _ = writeln!(out, "{}", op.mnemonic());
        }
        (None, _, _) => {
            let _ = writeln!(out, "Unknown opcode {}", ins.byte);
        }
    }
}
