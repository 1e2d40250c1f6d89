//! Typed decoding over a chunk's flat byte stream.
//!
//! A byte is an opcode or an operand depending only on where the cursor
//! stands. Callers ask for one or the other explicitly; the cursor never
//! guesses.

use thiserror::Error;

use crate::bytecode::{chunk::Chunk, opcode::OpCode, value::Value};

/// Decoding failures, each carrying the offending byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Byte at dispatch position is not an opcode.
    #[error("invalid opcode 0x{byte:02X} at offset {offset}")]
    InvalidOpcode {
        /// Raw byte.
        byte: u8,
        /// Its offset.
        offset: usize,
    },
    /// The stream ended where an opcode or operand was expected.
    #[error("unexpected end of code at offset {offset}")]
    UnexpectedEnd {
        /// Offset that was read past.
        offset: usize,
    },
    /// A constant operand points past the end of the pool.
    #[error("constant index {index} out of range (pool holds {count}) at offset {offset}")]
    ConstantOutOfRange {
        /// Operand value.
        index: u8,
        /// Pool size.
        count: usize,
        /// Offset of the operand byte.
        offset: usize,
    },
}

impl DecodeError {
    /// Offset the error refers to.
    pub fn offset(&self) -> usize {
        match *self {
            DecodeError::InvalidOpcode { offset, .. }
            | DecodeError::UnexpectedEnd { offset }
            | DecodeError::ConstantOutOfRange { offset, .. } => offset,
        }
    }
}

/// Forward-only reader over a borrowed chunk.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    chunk: &'a Chunk,
    ip: usize,
    op_start: usize,
}

impl<'a> Cursor<'a> {
    /// Cursor at offset 0.
    pub fn new(chunk: &'a Chunk) -> Self { Self::at(chunk, 0) }

    /// Cursor at an arbitrary offset (used by the disassembler).
    pub fn at(chunk: &'a Chunk, offset: usize) -> Self { Self { chunk, ip: offset, op_start: offset } }

    /// Chunk being decoded.
    pub fn chunk(&self) -> &'a Chunk { self.chunk }

    /// Offset of the next byte to read.
    pub fn offset(&self) -> usize { self.ip }

    /// Offset of the most recently decoded opcode.
    pub fn op_offset(&self) -> usize { self.op_start }

    /// Whether every byte was consumed.
    pub fn is_at_end(&self) -> bool { self.ip >= self.chunk.len() }

    /// Source line of the most recently decoded opcode.
    pub fn line(&self) -> Option<u32> { self.chunk.line_at(self.op_start) }

    /// Read the byte at dispatch position as an opcode.
    pub fn read_opcode(&mut self) -> Result<OpCode, DecodeError> {
        self.op_start = self.ip;
        let byte = self.next_byte()?;
        OpCode::decode(byte).ok_or(DecodeError::InvalidOpcode { byte, offset: self.op_start })
    }

    /// Read one operand byte.
    pub fn read_operand(&mut self) -> Result<u8, DecodeError> { self.next_byte() }

    /// Read a constant-index operand and resolve it against the pool.
    pub fn read_constant(&mut self) -> Result<(u8, Value), DecodeError> {
        let offset = self.ip;
        let index = self.read_operand()?;
        let value = self.chunk.constant(usize::from(index)).ok_or(DecodeError::ConstantOutOfRange {
            index,
            count: self.chunk.constants().len(),
            offset,
        })?;
        Ok((index, value))
    }

    fn next_byte(&mut self) -> Result<u8, DecodeError> {
        let byte = *self.chunk.code().get(self.ip).ok_or(DecodeError::UnexpectedEnd { offset: self.ip })?;
        self.ip += 1;
        Ok(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Chunk {
        let mut chunk = Chunk::new();
        chunk.write_constant(1.2, 10).unwrap();
        chunk.write_op(OpCode::Negate, 11);
        chunk.write_op(OpCode::Return, 12);
        chunk
    }

    #[test]
    fn reads_opcodes_and_operands() {
        let chunk = sample();
        let mut cur = Cursor::new(&chunk);

        assert_eq!(cur.read_opcode(), Ok(OpCode::Constant));
        assert_eq!(cur.line(), Some(10));
        assert_eq!(cur.read_constant(), Ok((0, 1.2)));
        assert_eq!(cur.read_opcode(), Ok(OpCode::Negate));
        assert_eq!(cur.op_offset(), 2);
        assert_eq!(cur.line(), Some(11));
        assert_eq!(cur.read_opcode(), Ok(OpCode::Return));
        assert!(cur.is_at_end());
        assert_eq!(cur.read_opcode(), Err(DecodeError::UnexpectedEnd { offset: 4 }));
    }

    #[test]
    fn invalid_opcode_reports_offset() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Return, 1);
        chunk.write(0xEE, 2);
        let mut cur = Cursor::at(&chunk, 1);
        let err = cur.read_opcode().unwrap_err();
        assert_eq!(err, DecodeError::InvalidOpcode { byte: 0xEE, offset: 1 });
        assert_eq!(err.offset(), 1);
        assert_eq!(cur.line(), Some(2));
    }

    #[test]
    fn missing_operand() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Constant, 1);
        let mut cur = Cursor::new(&chunk);
        cur.read_opcode().unwrap();
        assert_eq!(cur.read_constant(), Err(DecodeError::UnexpectedEnd { offset: 1 }));
    }

    #[test]
    fn constant_out_of_range() {
        let mut chunk = Chunk::new();
        chunk.add_constant(4.0);
        chunk.write_op(OpCode::Constant, 1);
        chunk.write(3, 1);
        let mut cur = Cursor::new(&chunk);
        cur.read_opcode().unwrap();
        assert_eq!(
            cur.read_constant(),
            Err(DecodeError::ConstantOutOfRange { index: 3, count: 1, offset: 1 })
        );
    }
}
