//! lumen-core — stockage du bytecode Lumen
//!
//! Fournit :
//! - `Chunk` : flux d'instructions, table des lignes, pool de constantes
//! - `GrowBuf<T>` : buffer extensible (capacité 8, puis ×2)
//! - `OpCode` : encodage des instructions (1 octet + opérandes fixes)
//! - `Cursor` : décodage typé (opcode vs opérande) d'un chunk
//! - `disasm` : désassembleur textuel (lecture seule)
//! - `asm` : mini-assembleur texte → `Chunk`
//! - Erreurs `CoreError` + alias `CoreResult<T>`
//!
//! Features :
//! - `serde` (par défaut) : derive `Serialize` sur les opcodes et le listing

#![deny(missing_docs)]

use thiserror::Error;

/* ─────────────────────────── Modules publics ─────────────────────────── */

/// Primitives de bytecode (chunk, opcodes, curseur, assembleur, désassembleur).
pub mod bytecode;

/// Raccourci : désassembleur textuel.
pub use bytecode::disasm;
/// Raccourci : assembleur minimal.
pub use bytecode::asm;
/// Raccourci : validations structurelles.
pub use bytecode::helpers;

pub use bytecode::{
    buffer::{grow_capacity, GrowBuf},
    chunk::{Chunk, BYTECODE_VERSION, MAX_CONSTANTS},
    cursor::{Cursor, DecodeError},
    opcode::OpCode,
    value::{format_value, Value},
};

/* ─────────────────────────── Résultat commun ─────────────────────────── */

/// Alias résultat commun au core.
pub type CoreResult<T> = core::result::Result<T, CoreError>;

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Erreurs de construction / d'encodage d'un chunk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Octet qui ne correspond à aucun opcode connu.
    #[error("invalid opcode 0x{byte:02X}")]
    InvalidOpcode {
        /// Octet brut lu.
        byte: u8,
    },

    /// L'opérande de `OP_CONSTANT` tient sur un octet : 256 constantes max.
    #[error("too many constants in one chunk (max {max})")]
    TooManyConstants {
        /// Nombre maximal de constantes adressables.
        max: usize,
    },

    /// Erreur de l'assembleur texte.
    #[error("line {line}: {message}")]
    Asm {
        /// Ligne source fautive (1-based).
        line: u32,
        /// Message court.
        message: String,
    },

    /// Chunk structurellement invalide (voir [`helpers::validate_chunk`]).
    #[error("malformed chunk at offset {offset}: {source}")]
    Malformed {
        /// Offset de l'instruction fautive.
        offset: usize,
        /// Erreur de décodage sous-jacente.
        source: DecodeError,
    },
}

impl CoreError {
    /// Construit une erreur d'assemblage.
    pub fn asm(line: u32, message: impl Into<String>) -> Self {
        CoreError::Asm { line, message: message.into() }
    }
}

/* ─────────────────────────── Prélude (reexports utiles) ─────────────────────────── */

/// Prélude pratique pour importer les types/funcs clés du crate.
pub mod prelude {
    /// Réexports utiles pour une importation rapide.
    pub use super::{
        format_value, Chunk, CoreError, CoreResult, Cursor, DecodeError, OpCode, Value,
        BYTECODE_VERSION, MAX_CONSTANTS,
    };
}

/* ─────────────────────────── Tests ─────────────────────────── */
