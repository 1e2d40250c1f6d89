//! `lumen` — CLI de la VM Lumen
//!
//! Ici on fait uniquement : parsing d'arguments, initialisation (logger,
//! couleur), et délégation à `lumen_cli` (lib). Sans sous-commande, on lance
//! le programme de démonstration.

#![forbid(unsafe_code)]

use std::{io, path::PathBuf, process::ExitCode};

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use lumen_cli as cli; // notre lib interne (src/lib.rs)

// ──────────────────────────── CLI (clap) ────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "lumen", version, about = "Lumen — chunks de bytecode et VM à pile", long_about = None)]
struct Opt {
    /// Augmente la verbosité (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux (casse la verbosité)
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue, global = true)]
    quiet: bool,

    /// Force la couleur (si la feature `color` est compilée)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,

    /// Sous-commandes (`demo` par défaut)
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Construire, désassembler et exécuter le programme de démonstration
    Demo {
        /// Tracer chaque instruction exécutée (stderr)
        #[arg(long)]
        trace: bool,
    },

    /// Assembler puis exécuter un programme texte
    Run {
        /// Fichier source (ou - pour stdin)
        input: Option<PathBuf>,
        /// Afficher le listing avant l'exécution
        #[arg(long)]
        disasm: bool,
        /// Tracer chaque instruction exécutée (stderr)
        #[arg(long)]
        trace: bool,
        /// Afficher le temps d'exécution
        #[arg(long)]
        time: bool,
    },

    /// Assembler puis désassembler un programme texte
    Disasm {
        /// Fichier source (ou - pour stdin)
        input: Option<PathBuf>,
        /// Sortie texte (stdout si omis)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Listing JSON
        #[arg(long)]
        json: bool,
        /// Refuser un chunk qui ne se décode pas proprement
        #[arg(long)]
        strict: bool,
    },
}

// ──────────────────────────── Entrée / Sortie ────────────────────────────

fn input_from_opt(p: Option<PathBuf>) -> cli::Input {
    match p {
        Some(path) if path.as_os_str() == "-" => cli::Input::Stdin,
        Some(path) => cli::Input::Path(path),
        None => cli::Input::Stdin,
    }
}

fn output_from_opt(p: Option<PathBuf>) -> cli::Output {
    p.map_or(cli::Output::Stdout, cli::Output::Path)
}

// ──────────────────────────── Logger / Verbosité ────────────────────────────

fn init_telemetry(verbose: u8, quiet: bool, trace_exec: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    cli::init_logger(level, trace_exec);
}

fn init_color(choice: ColorChoice) {
    // `owo-colors` détecte le TTY ; on ne fait que forcer via l'environnement.
    match choice {
        ColorChoice::Auto => {},
        ColorChoice::Always => {
            std::env::set_var("CLICOLOR_FORCE", "1");
            std::env::remove_var("NO_COLOR");
        },
        ColorChoice::Never => {
            std::env::set_var("NO_COLOR", "1");
            std::env::remove_var("CLICOLOR_FORCE");
        },
    }
}

// ──────────────────────────── main ────────────────────────────

fn main() -> ExitCode {
    let opt = match Opt::try_parse() {
        Ok(opt) => opt,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { exit(cli::EXIT_USAGE) } else { exit(cli::EXIT_OK) };
        },
    };

    match real_main(opt) {
        Ok(code) => exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            let io = e.chain().any(|c| c.downcast_ref::<io::Error>().is_some());
            exit(if io { cli::EXIT_IOERR } else { 1 })
        },
    }
}

fn real_main(opt: Opt) -> anyhow::Result<i32> {
    init_color(opt.color);

    use cli::{Command as C, DemoTask, DisasmTask, RunTask};

    let (command, trace_exec) = match opt.cmd.unwrap_or(Command::Demo { trace: false }) {
        Command::Demo { trace } => (C::Demo(DemoTask { disasm: true }), trace),
        Command::Run { input, disasm, trace, time } => {
            (C::Run(RunTask { input: input_from_opt(input), disasm, time }), trace)
        },
        Command::Disasm { input, output, json, strict } => (
            C::Disasm(DisasmTask {
                input: input_from_opt(input),
                output: output_from_opt(output),
                json,
                strict,
            }),
            false,
        ),
    };

    init_telemetry(opt.verbose, opt.quiet, trace_exec);
    cli::execute(command)
}

fn exit(code: i32) -> ExitCode { ExitCode::from(u8::try_from(code).unwrap_or(1)) }
