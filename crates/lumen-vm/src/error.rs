//! Erreurs d'exécution et résultat de `interpret`.

use lumen_core::{CoreError, DecodeError, OpCode};
use thiserror::Error;

/// Résultat d'un `interpret`.
pub type InterpretResult<T> = std::result::Result<T, InterpretError>;

/// Issue d'un run raté : « compilation » (ici : assemblage) ou exécution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpretError {
    /// Le programme n'a pas pu être transformé en chunk.
    #[error("compile error: {0}")]
    Compile(#[from] CoreError),

    /// Le chunk a échoué pendant l'exécution.
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

impl InterpretError {
    /// Code de sortie façon `sysexits` (65 = données, 70 = logiciel).
    pub fn exit_code(&self) -> i32 {
        match self {
            InterpretError::Compile(_) => 65,
            InterpretError::Runtime(_) => 70,
        }
    }

    /// L'erreur d'exécution, si c'en est une.
    pub fn as_runtime(&self) -> Option<&RuntimeError> {
        match self {
            InterpretError::Runtime(e) => Some(e),
            InterpretError::Compile(_) => None,
        }
    }
}

/// Erreur d'exécution, localisée dans le chunk.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}\n[line {line}] in script")]
pub struct RuntimeError {
    /// Nature de l'erreur.
    pub kind: RuntimeErrorKind,
    /// Offset de l'instruction fautive.
    pub offset: usize,
    /// Ligne source de l'instruction fautive (0 si inconnue).
    pub line: u32,
}

/// Catégories d'erreurs d'exécution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeErrorKind {
    /// Octet en position de dispatch qui n'est pas un opcode.
    #[error("invalid opcode 0x{byte:02X}")]
    InvalidOpcode {
        /// Octet lu.
        byte: u8,
    },

    /// Pas assez d'opérandes sur la pile.
    #[error("stack underflow: {op} needs {needed} operand(s), found {found}")]
    StackUnderflow {
        /// Instruction en cours.
        op: OpCode,
        /// Profondeur requise.
        needed: usize,
        /// Profondeur disponible.
        found: usize,
    },

    /// Pile pleine.
    #[error("stack overflow (limit {limit})")]
    StackOverflow {
        /// Profondeur maximale.
        limit: usize,
    },

    /// Index de constante hors du pool.
    #[error("constant index {index} out of range (pool holds {count})")]
    ConstantOutOfRange {
        /// Opérande lu.
        index: u8,
        /// Taille du pool.
        count: usize,
    },

    /// Fin du code atteinte sans `OP_RETURN` (ou opérande manquant).
    #[error("unexpected end of code")]
    UnexpectedEnd,

    /// Écriture du résultat impossible.
    #[error("cannot write result: {0}")]
    Output(String),
}

impl From<DecodeError> for RuntimeErrorKind {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::InvalidOpcode { byte, .. } => RuntimeErrorKind::InvalidOpcode { byte },
            DecodeError::UnexpectedEnd { .. } => RuntimeErrorKind::UnexpectedEnd,
            DecodeError::ConstantOutOfRange { index, count, .. } => {
                RuntimeErrorKind::ConstantOutOfRange { index, count }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_reports_line() {
        let err = RuntimeError {
            kind: RuntimeErrorKind::StackUnderflow { op: OpCode::Add, needed: 2, found: 0 },
            offset: 0,
            line: 3,
        };
        assert_eq!(
            err.to_string(),
            "stack underflow: OP_ADD needs 2 operand(s), found 0\n[line 3] in script"
        );
        assert_eq!(InterpretError::from(err).exit_code(), 70);
    }

    #[test]
    fn compile_errors() {
        let err = InterpretError::from(CoreError::asm(1, "unknown instruction `X`"));
        assert_eq!(err.exit_code(), 65);
        assert!(err.as_runtime().is_none());
        assert_eq!(err.to_string(), "compile error: line 1: unknown instruction `X`");
    }

    #[test]
    fn decode_errors_map() {
        assert_eq!(
            RuntimeErrorKind::from(DecodeError::ConstantOutOfRange { index: 2, count: 1, offset: 5 }),
            RuntimeErrorKind::ConstantOutOfRange { index: 2, count: 1 }
        );
        assert_eq!(
            RuntimeErrorKind::from(DecodeError::UnexpectedEnd { offset: 9 }),
            RuntimeErrorKind::UnexpectedEnd
        );
    }
}
