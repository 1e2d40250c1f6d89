//! Bytecode primitives: storage, encoding, decoding and the two text tools
//! (assembler and disassembler) built on top of them.

/// Growable buffer shared by the code, line and constant tables.
pub mod buffer;
/// Chunk representation (code + lines + constants).
pub mod chunk;
/// Typed decode cursor over a chunk.
pub mod cursor;
/// Opcode encoding.
pub mod opcode;
/// Literal values stored in the constant pool.
pub mod value;

pub mod asm;
pub mod disasm;
pub mod helpers;

pub use chunk::Chunk;
pub use cursor::{Cursor, DecodeError};
pub use opcode::OpCode;
pub use value::Value;
