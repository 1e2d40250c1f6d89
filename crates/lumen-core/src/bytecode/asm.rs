//! Tiny line-oriented assembler, the only chunk producer until a compiler
//! front end exists.
//!
//! ```text
//! ; comment (also allowed after an instruction)
//! CONSTANT 1.2      ; add 1.2 to the pool and emit OP_CONSTANT idx
//! CONSTANT #0       ; emit OP_CONSTANT 0 without touching the pool
//! CONST 5.6         ; add a constant, emit nothing
//! ADD
//! NEGATE
//! RETURN
//! BYTE 255          ; raw byte, no checks
//! ```
//!
//! Mnemonics are case-insensitive and the `OP_` prefix is optional. Each
//! emitted byte is tagged with the number of the text line it came from.

use crate::{
    bytecode::{chunk::Chunk, opcode::OpCode, value::Value},
    CoreError, CoreResult,
};

/// Assemble `source` into a fresh [`Chunk`].
pub fn assemble(source: &str) -> CoreResult<Chunk> {
    let mut chunk = Chunk::new();

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = u32::try_from(idx + 1).unwrap_or(u32::MAX);
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((h, r)) => (h, r.trim()),
            None => (line, ""),
        };

        match head.to_ascii_uppercase().as_str() {
            "CONST" => {
                chunk.add_constant(parse_number(rest, line_no)?);
            }
            "BYTE" => {
                let byte = rest
                    .parse::<u8>()
                    .map_err(|_| CoreError::asm(line_no, format!("BYTE expects 0..=255, got `{rest}`")))?;
                chunk.write(byte, line_no);
            }
            _ => {
                let op = OpCode::from_mnemonic(head)
                    .ok_or_else(|| CoreError::asm(line_no, format!("unknown instruction `{head}`")))?;
                emit(&mut chunk, op, rest, line_no)?;
            }
        }
    }

    Ok(chunk)
}

fn emit(chunk: &mut Chunk, op: OpCode, operand: &str, line_no: u32) -> CoreResult<()> {
    match op {
        OpCode::Constant => {
            if operand.is_empty() {
                return Err(CoreError::asm(line_no, "CONSTANT expects a number or `#index`"));
            }
            if let Some(ix) = operand.strip_prefix('#') {
                let ix = ix
                    .parse::<u8>()
                    .map_err(|_| CoreError::asm(line_no, format!("bad constant index `{ix}`")))?;
                chunk.write_op(OpCode::Constant, line_no);
                chunk.write(ix, line_no);
            } else {
                let value = parse_number(operand, line_no)?;
                chunk.write_constant(value, line_no).map_err(|e| CoreError::asm(line_no, e.to_string()))?;
            }
        }
        _ => {
            if !operand.is_empty() {
                return Err(CoreError::asm(line_no, format!("{op} takes no operand")));
            }
            chunk.write_op(op, line_no);
        }
    }
    Ok(())
}

fn parse_number(text: &str, line_no: u32) -> CoreResult<Value> {
    text.parse::<Value>()
        .map_err(|_| CoreError::asm(line_no, format!("expected a number, got `{text}`")))
}

fn strip_comment(line: &str) -> &str {
    line.split_once(';').map_or(line, |(code, _)| code)
}
