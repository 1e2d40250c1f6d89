//! lumen-vm — interpréteur à pile pour les chunks `lumen-core`
//!
//! - `Vm` : instance explicite (pas d'état global), liée à un chunk le temps
//!   d'un `interpret`
//! - `Stack` : pile d'opérandes bornée (`STACK_MAX`)
//! - `InterpretError` : `Compile` / `Runtime`, codes de sortie 65 / 70
//!
//! Sémantique arithmétique : flottants IEEE-754 ; la division par zéro donne
//! `inf`/`NaN` et n'est pas une erreur.
//!
//! Feature `tracing` (par défaut) : un événement `trace` par instruction sur
//! la cible `lumen_vm::exec`, plus `debug`/`warn` en début et fin de run.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]
#![cfg_attr(not(debug_assertions), warn(missing_docs))]

pub mod error;
pub mod stack;
pub mod vm;

pub use error::{InterpretError, InterpretResult, RuntimeError, RuntimeErrorKind};
pub use stack::{Stack, STACK_MAX};
pub use vm::{Capture, Vm, VmState};

pub use lumen_core::{Chunk, OpCode, Value};
