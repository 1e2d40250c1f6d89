//! Core bytecode container: instruction bytes, their source lines and the
//! constant pool.

use crate::{
    bytecode::{buffer::GrowBuf, opcode::OpCode, value::Value},
    CoreError, CoreResult,
};

/// Version of the instruction encoding produced by this crate.
pub const BYTECODE_VERSION: u16 = 1;

/// `OP_CONSTANT` carries a one-byte index.
pub const MAX_CONSTANTS: usize = u8::MAX as usize + 1;

/// Bytecode chunk.
///
/// Append-only while it is being built, then borrowed read-only by whoever
/// executes or inspects it. `code` and `lines` always have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    version: u16,
    code: GrowBuf<u8>,
    lines: GrowBuf<u32>,
    constants: GrowBuf<Value>,
}

impl Default for Chunk {
    fn default() -> Self { Self::new() }
}

impl Chunk {
    /// Create an empty chunk (nothing allocated yet).
    pub const fn new() -> Self {
        Self {
            version: BYTECODE_VERSION,
            code: GrowBuf::new(),
            lines: GrowBuf::new(),
            constants: GrowBuf::new(),
        }
    }

    /// Encoding version.
    pub fn version(&self) -> u16 { self.version }

    /// Append one byte (opcode or operand) produced by source line `line`.
    pub fn write(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    /// Append an opcode.
    pub fn write_op(&mut self, op: OpCode, line: u32) { self.write(op.into(), line); }

    /// Append a constant to the pool and return its index.
    ///
    /// Identical values are not merged: each call gets a fresh index.
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Add `value` to the pool and emit `OP_CONSTANT idx`.
    ///
    /// Fails once the pool outgrows the one-byte operand. The constant stays
    /// in the pool in that case, but no code is emitted.
    pub fn write_constant(&mut self, value: Value, line: u32) -> CoreResult<u8> {
        let idx = self.add_constant(value);
        let operand =
            u8::try_from(idx).map_err(|_| CoreError::TooManyConstants { max: MAX_CONSTANTS })?;
        self.write_op(OpCode::Constant, line);
        self.write(operand, line);
        Ok(operand)
    }

    /// Release all storage and return to the empty state.
    pub fn free(&mut self) {
        self.code.free();
        self.lines.free();
        self.constants.free();
    }

    /// Number of code bytes.
    pub fn len(&self) -> usize { self.code.len() }

    /// Whether no byte was written.
    pub fn is_empty(&self) -> bool { self.code.is_empty() }

    /// Capacity of the code (and line) storage.
    pub fn capacity(&self) -> usize { self.code.capacity() }

    /// Instruction bytes.
    pub fn code(&self) -> &[u8] { &self.code }

    /// Source line of every code byte.
    pub fn lines(&self) -> &[u32] { &self.lines }

    /// Constant pool.
    pub fn constants(&self) -> &[Value] { &self.constants }

    /// Lookup a constant by index.
    pub fn constant(&self, idx: usize) -> Option<Value> { self.constants.get(idx).copied() }

    /// Source line of the byte at `offset`.
    pub fn line_at(&self, offset: usize) -> Option<u32> { self.lines.get(offset).copied() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn new_chunk_is_empty() {
        let chunk = Chunk::new();
        assert!(chunk.is_empty());
        assert_eq!(chunk.capacity(), 0);
        assert!(chunk.constants().is_empty());
        assert_eq!(chunk.version(), BYTECODE_VERSION);
    }

    #[test]
    fn write_records_line() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Return, 7);
        chunk.write(0xAB, 8);
        assert_eq!(chunk.code(), &[OpCode::Return as u8, 0xAB]);
        assert_eq!(chunk.lines(), &[7, 8]);
        assert_eq!(chunk.line_at(1), Some(8));
        assert_eq!(chunk.line_at(2), None);
    }

    #[test]
    fn constants_are_not_deduplicated() {
        let mut chunk = Chunk::new();
        assert_eq!(chunk.add_constant(1.5), 0);
        assert_eq!(chunk.add_constant(1.5), 1);
        assert_eq!(chunk.constants(), &[1.5, 1.5]);
    }

    #[test]
    fn write_constant_emits_load() {
        let mut chunk = Chunk::new();
        chunk.add_constant(9.0);
        assert_eq!(chunk.write_constant(1.2, 123), Ok(1));
        assert_eq!(chunk.code(), &[OpCode::Constant as u8, 1]);
        assert_eq!(chunk.lines(), &[123, 123]);
    }

    #[test]
    fn write_constant_rejects_257th() {
        let mut chunk = Chunk::new();
        for i in 0..MAX_CONSTANTS {
            chunk.write_constant(i as f64, 1).unwrap();
        }
        let before = chunk.len();
        assert_eq!(
            chunk.write_constant(0.5, 2),
            Err(CoreError::TooManyConstants { max: MAX_CONSTANTS })
        );
        assert_eq!(chunk.len(), before);
    }

    #[test]
    fn free_returns_to_empty() {
        let mut chunk = Chunk::new();
        chunk.write_constant(1.0, 1).unwrap();
        chunk.write_op(OpCode::Return, 1);
        chunk.free();
        assert_eq!(chunk, Chunk::new());
        assert_eq!(chunk.capacity(), 0);

        chunk.write_op(OpCode::Return, 2);
        assert_eq!(chunk.len(), 1);
    }

    proptest! {
        #[test]
        fn growth_keeps_every_byte(writes in proptest::collection::vec((any::<u8>(), any::<u32>()), 0..600)) {
            let mut chunk = Chunk::new();
            for &(byte, line) in &writes {
                chunk.write(byte, line);
            }
            prop_assert_eq!(chunk.len(), writes.len());
            prop_assert!(chunk.capacity() >= writes.len());
            prop_assert_eq!(chunk.lines().len(), chunk.code().len());
            for (i, &(byte, line)) in writes.iter().enumerate() {
                prop_assert_eq!(chunk.code()[i], byte);
                prop_assert_eq!(chunk.lines()[i], line);
            }
        }

        #[test]
        fn constant_indices_are_stable(values in proptest::collection::vec(any::<f64>(), 1..300)) {
            let mut chunk = Chunk::new();
            let mut assigned = Vec::new();
            for &v in &values {
                let idx = chunk.add_constant(v);
                prop_assert_eq!(idx, assigned.len());
                prop_assert_eq!(chunk.constant(idx).map(f64::to_bits), Some(v.to_bits()));
                assigned.push(idx);
            }
            for (&idx, &v) in assigned.iter().zip(&values) {
                prop_assert_eq!(chunk.constant(idx).map(f64::to_bits), Some(v.to_bits()));
            }
        }
    }
}
