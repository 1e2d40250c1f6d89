//! lumen-cli — bibliothèque interne du binaire `lumen`
//!
//! But : garder `main.rs` réduit au parsing d'arguments, et mettre ici tout ce
//! qui se teste : construction du programme de démo, assemblage, exécution,
//! désassemblage, écriture des sorties.
//!
//! Points clés :
//! - `demo` : le programme d'origine, assemblé à la main par appels `write`
//! - `run` : source assembleur → chunk → VM
//! - `disasm` : listing texte ou JSON
//! - Traces (`feature = "trace"`) et couleurs (`feature = "color"`) optionnelles

#![deny(unused_must_use)]
#![forbid(unsafe_code)]

use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{anyhow, Context, Result};

use lumen_core::{asm, disasm, Chunk, CoreResult, OpCode};
use lumen_vm::{InterpretError, Vm};

#[cfg(feature = "color")]
use owo_colors::{OwoColorize, Stream};

// ───────────────────────────── Codes de sortie ─────────────────────────────

/// Succès.
pub const EXIT_OK: i32 = 0;
/// Mauvais usage de la ligne de commande.
pub const EXIT_USAGE: i32 = 64;
/// Programme invalide (assemblage).
pub const EXIT_DATAERR: i32 = 65;
/// Erreur d'exécution dans la VM.
pub const EXIT_SOFTWARE: i32 = 70;
/// Erreur d'E/S.
pub const EXIT_IOERR: i32 = 74;

// ───────────────────────────── Types publics ─────────────────────────────

/// Commande haut-niveau, déjà sortie du parsing de `main.rs`.
#[derive(Clone, Debug)]
pub enum Command {
    /// Construit et exécute le programme de démonstration.
    Demo(DemoTask),
    /// Assemble puis exécute un programme texte.
    Run(RunTask),
    /// Assemble puis désassemble un programme texte.
    Disasm(DisasmTask),
}

#[derive(Clone, Debug, Default)]
pub struct DemoTask {
    pub disasm: bool, // affiche le listing avant l'exécution
}

#[derive(Clone, Debug, Default)]
pub struct RunTask {
    pub input: Input,
    pub disasm: bool, // listing avant l'exécution
    pub time: bool,   // afficher le timing
}

#[derive(Clone, Debug, Default)]
pub struct DisasmTask {
    pub input: Input,
    pub output: Output,
    pub json: bool,   // listing structuré (serde_json)
    pub strict: bool, // échec si le chunk ne se décode pas proprement
}

/// Entrée texte : fichier ou `-` (=stdin).
#[derive(Clone, Debug, Default)]
pub enum Input {
    Path(PathBuf),
    #[default]
    Stdin,
}

impl Input {
    fn name(&self) -> String {
        match self {
            Input::Path(p) => display(p),
            Input::Stdin => "<stdin>".into(),
        }
    }
}

/// Sortie texte.
#[derive(Clone, Debug, Default)]
pub enum Output {
    Path(PathBuf),
    #[default]
    Stdout,
}

// ───────────────────────────── Initialisation ─────────────────────────────

/// Installe le subscriber `tracing` (stderr). `RUST_LOG` garde la priorité sur
/// `level` ; `trace_exec` ajoute la trace instruction par instruction.
pub fn init_logger(level: &str, trace_exec: bool) {
    #[cfg(feature = "trace")]
    {
        use tracing_subscriber::EnvFilter;

        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        if trace_exec {
            if let Ok(directive) = "lumen_vm::exec=trace".parse::<tracing_subscriber::filter::Directive>() {
                filter = filter.add_directive(directive);
            }
        }
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .without_time()
            .try_init();
    }
    #[cfg(not(feature = "trace"))]
    {
        let _ = (level, trace_exec);
    }
}

// ───────────────────────────── Exécution ─────────────────────────────

/// Exécute une commande, sorties sur stdout. Retourne un code de sortie.
pub fn execute(cmd: Command) -> Result<i32> { execute_to(cmd, StdoutSink) }

/// Variante de [`execute`] écrivant listings et résultats dans `out`.
pub fn execute_to<W>(cmd: Command, out: W) -> Result<i32>
where
    W: Write + Send + Clone + 'static,
{
    match cmd {
        Command::Demo(t) => demo_entry(&t, out),
        Command::Run(t) => run_entry(&t, out),
        Command::Disasm(t) => disasm_entry(&t, out),
    }
}

/// Le programme du pilote d'origine : `-((1.2 + 3.4) / 5.6)`, ligne 123.
pub fn demo_chunk() -> CoreResult<Chunk> {
    let mut chunk = Chunk::new();

    chunk.write_constant(1.2, 123)?;
    chunk.write_constant(3.4, 123)?;
    chunk.write_op(OpCode::Add, 123);

    chunk.write_constant(5.6, 123)?;
    chunk.write_op(OpCode::Divide, 123);
    chunk.write_op(OpCode::Negate, 123);
    chunk.write_op(OpCode::Return, 123);

    Ok(chunk)
}

fn demo_entry<W>(task: &DemoTask, mut out: W) -> Result<i32>
where
    W: Write + Send + Clone + 'static,
{
    let mut vm = Vm::with_output(out.clone());
    let mut chunk = demo_chunk()?;

    if task.disasm {
        out.write_all(disasm::disassemble_chunk(&chunk, "test chunk").as_bytes())?;
    }
    writeln!(out, "== Running Code ==")?;
    out.flush()?;

    let code = report(vm.interpret(&chunk).map(|_| ()));

    vm.free();
    chunk.free();
    Ok(code)
}

fn run_entry<W>(task: &RunTask, mut out: W) -> Result<i32>
where
    W: Write + Send + Clone + 'static,
{
    let src = read_source(&task.input).context("lecture de la source")?;
    let chunk = match asm::assemble(&src) {
        Ok(chunk) => chunk,
        Err(e) => return Ok(report(Err(InterpretError::Compile(e)))),
    };
    tracing::info!(input = %task.input.name(), bytes = chunk.len(), "assembled");

    if task.disasm {
        out.write_all(disasm::disassemble_chunk(&chunk, &task.input.name()).as_bytes())?;
        out.flush()?;
    }

    let mut vm = Vm::with_output(out);
    let start = Instant::now();
    let code = report(vm.interpret(&chunk).map(|_| ()));
    if task.time {
        status_info(
            "TIME",
            &format!("{} instructions in {} µs", vm.instructions_executed(), start.elapsed().as_micros()),
        );
    }
    Ok(code)
}

fn disasm_entry<W>(task: &DisasmTask, mut out: W) -> Result<i32>
where
    W: Write + Send + Clone + 'static,
{
    let src = read_source(&task.input).context("lecture de la source")?;
    let chunk = match asm::assemble(&src) {
        Ok(chunk) => chunk,
        Err(e) => return Ok(report(Err(InterpretError::Compile(e)))),
    };

    if task.strict {
        if let Err(e) = lumen_core::helpers::validate_chunk(&chunk) {
            status_err("INVALID", &e.to_string());
            return Ok(EXIT_DATAERR);
        }
    }

    let text = if task.json {
        let mut s = serde_json::to_string_pretty(&disasm::listing(&chunk))?;
        s.push('\n');
        s
    } else {
        disasm::disassemble_chunk(&chunk, &task.input.name())
    };

    match &task.output {
        Output::Stdout => {
            out.write_all(text.as_bytes())?;
            out.flush()?;
        }
        Output::Path(p) => {
            write_text_atomic(p, &text)?;
            status_ok("DISASM", &display(p));
        }
    }
    Ok(EXIT_OK)
}

/// Affiche l'erreur éventuelle sur stderr et la traduit en code de sortie.
fn report(result: Result<(), InterpretError>) -> i32 {
    match result {
        Ok(()) => EXIT_OK,
        Err(e) => {
            status_err("error", &e.to_string());
            e.exit_code()
        }
    }
}

// ───────────────────────────── Utilitaires E/S ─────────────────────────────

/// `io::Stdout` clonable : la VM et le listing partagent la même sortie.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutSink;

impl Write for StdoutSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> { io::stdout().lock().write(buf) }

    fn flush(&mut self) -> io::Result<()> { io::stdout().lock().flush() }
}

fn read_source(input: &Input) -> Result<String> {
    match input {
        Input::Stdin => {
            let mut s = String::new();
            io::stdin().read_to_string(&mut s)?;
            Ok(s)
        }
        Input::Path(p) => {
            let f = File::open(p).with_context(|| format!("ouverture: {}", display(p)))?;
            let mut r = BufReader::new(f);
            let mut s = String::new();
            r.read_to_string(&mut s)?;
            Ok(s)
        }
    }
}

fn write_text_atomic(path: &Path, text: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        Some(_) => Path::new("."),
        None => return Err(anyhow!("chemin de sortie sans parent: {}", display(path))),
    };
    let tmp = unique_tmp_path(parent, path.file_name().unwrap_or_default());
    {
        let mut w = BufWriter::new(File::create(&tmp)?);
        w.write_all(text.as_bytes())?;
        w.flush()?;
    }
    fs::rename(&tmp, path).or_else(|_| {
        // fallback : copie puis suppr tmp
        fs::copy(&tmp, path).map(|_| ()).and_then(|()| fs::remove_file(&tmp))
    })?;
    Ok(())
}

fn unique_tmp_path(dir: &Path, base: &std::ffi::OsStr) -> PathBuf {
    let mut i = 0u32;
    loop {
        let candidate = dir.join(format!("{}.tmp{}", base.to_string_lossy(), i));
        if !candidate.exists() {
            return candidate;
        }
        i = i.wrapping_add(1);
    }
}

fn display(p: &Path) -> String { p.to_string_lossy().to_string() }

// ───────────────────────────── Sorties jolies ─────────────────────────────

fn status_ok(tag: &str, msg: &str) {
    #[cfg(feature = "color")]
    eprintln!("{} {}", tag.if_supports_color(Stream::Stderr, |t| t.green()), msg);
    #[cfg(not(feature = "color"))]
    eprintln!("{tag} {msg}");
}

fn status_info(tag: &str, msg: &str) {
    #[cfg(feature = "color")]
    eprintln!("{} {}", tag.if_supports_color(Stream::Stderr, |t| t.blue()), msg);
    #[cfg(not(feature = "color"))]
    eprintln!("{tag} {msg}");
}

fn status_err(tag: &str, msg: &str) {
    #[cfg(feature = "color")]
    eprintln!("{}: {}", tag.if_supports_color(Stream::Stderr, |t| t.red()), msg);
    #[cfg(not(feature = "color"))]
    eprintln!("{tag}: {msg}");
}

// ───────────────────────────── Tests ─────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_vm::Capture;
    use pretty_assertions::assert_eq;

    fn source_file(text: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(text.as_bytes()).unwrap();
        f
    }

    #[test]
    fn demo_prints_listing_then_result() {
        let out = Capture::new();
        let code = execute_to(Command::Demo(DemoTask { disasm: true }), out.clone()).unwrap();
        assert_eq!(code, EXIT_OK);
        assert_eq!(
            out.contents(),
            "\
== test chunk ==
0000  123 OP_CONSTANT         0 '1.2'
0002    | OP_CONSTANT         1 '3.4'
0004    | OP_ADD
0005    | OP_CONSTANT         2 '5.6'
0007    | OP_DIVIDE
0008    | OP_NEGATE
0009    | OP_RETURN
== Running Code ==
-0.821429
"
        );
    }

    #[test]
    fn demo_chunk_is_well_formed() {
        let chunk = demo_chunk().unwrap();
        lumen_core::helpers::validate_chunk(&chunk).unwrap();
        assert!(lumen_core::helpers::ends_with_return(&chunk));
        assert_eq!(chunk.len(), 10);
        assert_eq!(chunk.constants(), &[1.2, 3.4, 5.6]);
        assert_eq!(chunk.code(), &[0, 0, 0, 1, 1, 0, 2, 4, 5, 6]);
        assert!(chunk.lines().iter().all(|&l| l == 123));
    }

    #[test]
    fn run_file() {
        let f = source_file("CONSTANT 5.6\nCONSTANT 0\nDIVIDE\nRETURN\n");
        let out = Capture::new();
        let task = RunTask { input: Input::Path(f.path().to_path_buf()), ..RunTask::default() };
        assert_eq!(execute_to(Command::Run(task), out.clone()).unwrap(), EXIT_OK);
        assert_eq!(out.contents(), "inf\n");
    }

    #[test]
    fn run_exit_codes() {
        let bad_asm = source_file("CONSTANT 1\nPRINT\n");
        let task = RunTask { input: Input::Path(bad_asm.path().to_path_buf()), ..RunTask::default() };
        assert_eq!(execute_to(Command::Run(task), Capture::new()).unwrap(), EXIT_DATAERR);

        let underflow = source_file("ADD\nRETURN\n");
        let out = Capture::new();
        let task = RunTask { input: Input::Path(underflow.path().to_path_buf()), ..RunTask::default() };
        assert_eq!(execute_to(Command::Run(task), out.clone()).unwrap(), EXIT_SOFTWARE);
        assert_eq!(out.contents(), "");
    }

    #[test]
    fn missing_file_is_an_error() {
        let task = RunTask { input: Input::Path(PathBuf::from("/nonexistent/prog.lasm")), ..RunTask::default() };
        let err = execute_to(Command::Run(task), Capture::new()).unwrap_err();
        assert!(err.chain().any(|c| c.downcast_ref::<io::Error>().is_some()));
    }

    #[test]
    fn disasm_to_file_and_json() {
        let f = source_file("CONSTANT 2\nNEGATE\nRETURN\n");
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("listing.txt");
        let task = DisasmTask {
            input: Input::Path(f.path().to_path_buf()),
            output: Output::Path(target.clone()),
            ..DisasmTask::default()
        };
        assert_eq!(execute_to(Command::Disasm(task), Capture::new()).unwrap(), EXIT_OK);
        let text = fs::read_to_string(&target).unwrap();
        assert!(text.ends_with("0000    1 OP_CONSTANT         0 '2'\n0002    2 OP_NEGATE\n0003    3 OP_RETURN\n"), "{text}");

        let out = Capture::new();
        let task = DisasmTask { input: Input::Path(f.path().to_path_buf()), json: true, ..DisasmTask::default() };
        assert_eq!(execute_to(Command::Disasm(task), out.clone()).unwrap(), EXIT_OK);
        let json: serde_json::Value = serde_json::from_str(&out.contents()).unwrap();
        assert_eq!(json.as_array().map(Vec::len), Some(3));
        assert_eq!(json[1]["opcode"], "Negate");
    }

    #[test]
    fn disasm_strict_rejects_bad_chunk() {
        let f = source_file("CONSTANT #3\nRETURN\n");
        let task = DisasmTask { input: Input::Path(f.path().to_path_buf()), strict: true, ..DisasmTask::default() };
        assert_eq!(execute_to(Command::Disasm(task), Capture::new()).unwrap(), EXIT_DATAERR);
    }
}
