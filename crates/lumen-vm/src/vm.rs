//! Interpréteur : une `Vm` explicite, une pile d'opérandes, une boucle de
//! dispatch linéaire sur un `Chunk` emprunté en lecture seule.

use std::{
    fmt,
    io::{self, Write},
    sync::{Arc, Mutex, PoisonError},
};

use lumen_core::{asm, format_value, Chunk, Cursor, OpCode, Value};

use crate::{
    error::{InterpretResult, RuntimeError, RuntimeErrorKind},
    stack::Stack,
};

/* ─────────────────────────── État ─────────────────────────── */

/// Cycle de vie d'une VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VmState {
    /// Aucun chunk lié (neuve, ou après `free`).
    #[default]
    Idle,
    /// Boucle de dispatch en cours.
    Running,
    /// Arrêt normal sur `OP_RETURN`.
    HaltedOk,
    /// Arrêt sur erreur d'exécution.
    HaltedError,
}

/* ─────────────────────────── VM ─────────────────────────── */

/// Machine virtuelle à pile.
///
/// Plusieurs instances peuvent coexister ; aucune n'a d'état global.
pub struct Vm {
    stack: Stack,
    state: VmState,
    last_error: Option<RuntimeError>,
    executed: u64,
    out: Box<dyn Write + Send>,
}

impl Default for Vm {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm")
            .field("state", &self.state)
            .field("stack", &self.stack)
            .field("last_error", &self.last_error)
            .field("executed", &self.executed)
            .finish_non_exhaustive()
    }
}

impl Vm {
    /// VM dont `OP_RETURN` écrit le résultat sur `stdout`.
    pub fn new() -> Self { Self::with_output(io::stdout()) }

    /// VM écrivant le résultat de `OP_RETURN` dans `out`.
    pub fn with_output(out: impl Write + Send + 'static) -> Self {
        Self {
            stack: Stack::new(),
            state: VmState::Idle,
            last_error: None,
            executed: 0,
            out: Box::new(out),
        }
    }

    /// État courant.
    pub fn state(&self) -> VmState { self.state }

    /// Pile d'opérandes (bas → sommet) telle que laissée par le dernier run.
    pub fn stack(&self) -> &[Value] { self.stack.as_slice() }

    /// Dernière erreur d'exécution (effacée au run suivant).
    pub fn last_error(&self) -> Option<&RuntimeError> { self.last_error.as_ref() }

    /// Nombre d'instructions exécutées par le dernier run.
    pub fn instructions_executed(&self) -> u64 { self.executed }

    /// Libère la pile et revient à `Idle`. La VM reste réutilisable.
    pub fn free(&mut self) {
        self.stack.free();
        self.state = VmState::Idle;
        self.last_error = None;
        self.executed = 0;
    }

    /// Assemble `source` puis l'exécute.
    pub fn interpret_source(&mut self, source: &str) -> InterpretResult<Option<Value>> {
        let chunk = asm::assemble(source)?;
        self.interpret(&chunk)
    }

    /// Exécute `chunk` depuis l'offset 0 jusqu'à `OP_RETURN` ou une erreur.
    ///
    /// Renvoie le sommet de pile au moment du `OP_RETURN` (`None` si la pile
    /// était vide). Après une erreur, le contenu de la pile n'a pas de sens.
    pub fn interpret(&mut self, chunk: &Chunk) -> InterpretResult<Option<Value>> {
        self.stack.reset();
        self.state = VmState::Running;
        self.last_error = None;
        self.executed = 0;

        #[cfg(feature = "tracing")]
        tracing::debug!(bytes = chunk.len(), constants = chunk.constants().len(), "interpret");

        let mut cur = Cursor::new(chunk);
        match self.run(&mut cur) {
            Ok(result) => {
                self.state = VmState::HaltedOk;
                #[cfg(feature = "tracing")]
                tracing::debug!(executed = self.executed, ?result, "halted");
                Ok(result)
            }
            Err(kind) => {
                let offset = cur.op_offset();
                let line = chunk
                    .line_at(offset)
                    .or_else(|| chunk.lines().last().copied())
                    .unwrap_or_default();
                let err = RuntimeError { kind, offset, line };
                #[cfg(feature = "tracing")]
                tracing::warn!(offset, line, error = %err.kind, "runtime error");
                self.state = VmState::HaltedError;
                self.last_error = Some(err.clone());
                Err(err.into())
            }
        }
    }

    fn run(&mut self, cur: &mut Cursor<'_>) -> Result<Option<Value>, RuntimeErrorKind> {
        loop {
            // Point d'extension pour la préemption : un budget d'instructions
            // (`self.executed`) ou une échéance se vérifieraient ici.
            #[cfg(feature = "tracing")]
            self.trace_instruction(cur);

            let op = cur.read_opcode()?;
            self.executed += 1;

            let needed = op.stack_inputs();
            if self.stack.len() < needed {
                return Err(RuntimeErrorKind::StackUnderflow { op, needed, found: self.stack.len() });
            }

            match op {
                OpCode::Constant => {
                    let (_, value) = cur.read_constant()?;
                    self.push(value)?;
                }
                OpCode::Add => self.binary_op(op, |a, b| a + b)?,
                OpCode::Subtract => self.binary_op(op, |a, b| a - b)?,
                OpCode::Multiply => self.binary_op(op, |a, b| a * b)?,
                // IEEE-754 : x/0 donne ±inf, 0/0 donne NaN, sans erreur.
                OpCode::Divide => self.binary_op(op, |a, b| a / b)?,
                OpCode::Negate => {
                    let value = self.pop(op)?;
                    self.push(-value)?;
                }
                OpCode::Return => {
                    let result = self.stack.pop();
                    if let Some(value) = result {
                        writeln!(self.out, "{}", format_value(value))
                            .and_then(|()| self.out.flush())
                            .map_err(|e| RuntimeErrorKind::Output(e.to_string()))?;
                    }
                    return Ok(result);
                }
            }
        }
    }

    fn binary_op(&mut self, op: OpCode, f: impl Fn(Value, Value) -> Value) -> Result<(), RuntimeErrorKind> {
        let b = self.pop(op)?;
        let a = self.pop(op)?;
        self.push(f(a, b))
    }

    fn push(&mut self, value: Value) -> Result<(), RuntimeErrorKind> {
        self.stack
            .push(value)
            .map_err(|_| RuntimeErrorKind::StackOverflow { limit: self.stack.limit() })
    }

    fn pop(&mut self, op: OpCode) -> Result<Value, RuntimeErrorKind> {
        self.stack.pop().ok_or(RuntimeErrorKind::StackUnderflow {
            op,
            needed: op.stack_inputs(),
            found: 0,
        })
    }

    #[cfg(feature = "tracing")]
    fn trace_instruction(&self, cur: &Cursor<'_>) {
        if !tracing::enabled!(target: "lumen_vm::exec", tracing::Level::TRACE) || cur.is_at_end() {
            return;
        }
        let mut text = String::new();
        lumen_core::disasm::disassemble_instruction(cur.chunk(), cur.offset(), &mut text);
        tracing::trace!(target: "lumen_vm::exec", stack = ?self.stack, "{}", text.trim_end());
    }
}

/* ─────────────────────────── Capture de sortie ─────────────────────────── */

/// Sortie partagée, pratique pour relire ce que la VM a écrit.
#[derive(Debug, Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    /// Tampon vide.
    pub fn new() -> Self { Self::default() }

    /// Contenu écrit jusqu'ici.
    pub fn contents(&self) -> String {
        let buf = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}
