//! Structural validation reused by tooling.

use crate::{
    bytecode::{chunk::Chunk, cursor::Cursor, opcode::OpCode},
    CoreError, CoreResult,
};

/// Check that a chunk decodes cleanly from start to end.
///
/// Every dispatch byte must be an opcode, every operand must be present and
/// every constant index must resolve. The VM checks the same things lazily;
/// this walks the whole chunk up front.
pub fn validate_chunk(chunk: &Chunk) -> CoreResult<()> {
    let mut cur = Cursor::new(chunk);
    while !cur.is_at_end() {
        let op = cur.read_opcode().map_err(|source| CoreError::Malformed { offset: source.offset(), source })?;
        if op == OpCode::Constant {
            cur.read_constant()
                .map_err(|source| CoreError::Malformed { offset: cur.op_offset(), source })?;
        }
    }
    Ok(())
}

/// Whether the last instruction of the chunk is `OP_RETURN`.
pub fn ends_with_return(chunk: &Chunk) -> bool {
    let mut last = None;
    let mut cur = Cursor::new(chunk);
    while !cur.is_at_end() {
        let Ok(op) = cur.read_opcode() else { return false };
        for _ in 0..op.operand_count() {
            if cur.read_operand().is_err() {
                return false;
            }
        }
        last = Some(op);
    }
    last == Some(OpCode::Return)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{asm::assemble, DecodeError};
    use pretty_assertions::assert_eq;

    #[test]
    fn accepts_well_formed() -> CoreResult<()> {
        let chunk = assemble("CONSTANT 1\nCONSTANT 2\nADD\nRETURN")?;
        validate_chunk(&chunk)?;
        assert!(ends_with_return(&chunk));
        Ok(())
    }

    #[test]
    fn rejects_bad_constant() -> CoreResult<()> {
        let chunk = assemble("CONST 1\nADD\nCONSTANT #4\nRETURN")?;
        assert_eq!(
            validate_chunk(&chunk),
            Err(CoreError::Malformed {
                offset: 1,
                source: DecodeError::ConstantOutOfRange { index: 4, count: 1, offset: 2 },
            })
        );
        Ok(())
    }

    #[test]
    fn rejects_unknown_byte() -> CoreResult<()> {
        let chunk = assemble("RETURN\nBYTE 42")?;
        assert_eq!(
            validate_chunk(&chunk),
            Err(CoreError::Malformed { offset: 1, source: DecodeError::InvalidOpcode { byte: 42, offset: 1 } })
        );
        assert!(!ends_with_return(&chunk));
        Ok(())
    }

    #[test]
    fn missing_return() -> CoreResult<()> {
        let chunk = assemble("CONSTANT 1\nNEGATE")?;
        validate_chunk(&chunk)?;
        assert!(!ends_with_return(&chunk));
        assert!(!ends_with_return(&Chunk::new()));
        Ok(())
    }
}
