//! The routc command line interface.
//!
//! `routc compile <input.rout> [output_dir]` writes `<stem>.wat` into the
//! output directory (default `output/`) and, unless `--wat-only` is given,
//! assembles it to `<stem>.wasm` with the external `wat2wasm` tool.
//! Failures from that tool are surfaced verbatim. Exit code is 0 on
//! success, 1 on any failure.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use routc_drv::{compile_to_wat, render_ast, render_tokens, CompileOptions};

#[derive(Parser, Debug)]
#[command(name = "routc")]
#[command(version)]
#[command(about = "Compiler for the Rout language, targeting WebAssembly", long_about = None)]
struct Cli {
    /// Enable debug logging for every pipeline phase
    #[arg(short, long, global = true, env = "ROUTC_VERBOSE")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a source file to a WebAssembly module
    Compile(CompileCommand),
}

#[derive(Args, Debug)]
struct CompileCommand {
    /// Input source file (conventionally *.rout)
    input: PathBuf,

    /// Directory for the produced artifacts
    #[arg(default_value = "output")]
    output_dir: PathBuf,

    /// Write the .wat file only; do not invoke wat2wasm
    #[arg(long)]
    wat_only: bool,

    /// Skip the optimizer stage
    #[arg(long)]
    no_optimize: bool,

    /// Print the token stream and stop
    #[arg(long)]
    emit_tokens: bool,

    /// Print the parsed tree and stop
    #[arg(long)]
    emit_ast: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("ROUTC_LOG")
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run(cli) {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Compile(cmd) => compile(cmd),
    }
}

fn compile(cmd: CompileCommand) -> Result<()> {
    let source = std::fs::read_to_string(&cmd.input)
        .with_context(|| format!("cannot read {}", cmd.input.display()))?;

    if cmd.emit_tokens {
        print!("{}", render_tokens(&source));
        return Ok(());
    }
    if cmd.emit_ast {
        print!("{}", render_ast(&source)?);
        return Ok(());
    }

    let options = CompileOptions {
        optimize: !cmd.no_optimize,
    };
    let module = compile_to_wat(&source, &options)?;

    for warning in &module.warnings {
        eprintln!("warning: {}", warning.message);
    }
    tracing::debug!(rewrites = module.rewrites, "optimizer applied");

    std::fs::create_dir_all(&cmd.output_dir)
        .with_context(|| format!("cannot create {}", cmd.output_dir.display()))?;

    let stem = cmd
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("out");
    let wat_path = cmd.output_dir.join(format!("{stem}.wat"));
    std::fs::write(&wat_path, &module.wat)
        .with_context(|| format!("cannot write {}", wat_path.display()))?;
    println!("wrote {}", wat_path.display());

    if !cmd.wat_only {
        let wasm_path = cmd.output_dir.join(format!("{stem}.wasm"));
        assemble(&wat_path, &wasm_path)?;
        println!("wrote {}", wasm_path.display());
    }

    Ok(())
}

/// Invokes the external `wat2wasm` assembler, passing its own complaints
/// through unchanged.
fn assemble(wat_path: &Path, wasm_path: &Path) -> Result<()> {
    let output = Command::new("wat2wasm")
        .arg(wat_path)
        .arg("-o")
        .arg(wasm_path)
        .output()
        .context("failed to run wat2wasm (is it installed and on PATH?)")?;

    if !output.status.success() {
        bail!(
            "wat2wasm failed ({}):\n{}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim_end()
        );
    }
    Ok(())
}
