//! TAC Compiler Driver
//!
//! Reads a three-address-code program (textual or JSON) and writes MIPS
//! assembly for it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use tacc_backend::normalize::validate;
use tacc_backend::{generate_with_options, split_functions, CodegenOptions, Liveness};
use tacc_ir::TacProgram;

#[derive(Parser)]
#[command(name = "tacc")]
#[command(about = "Three-address code to MIPS compiler")]
#[command(version = "0.1.0")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a TAC program to assembly
    Compile {
        /// Input TAC file
        input: PathBuf,

        /// Output assembly file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Read the input as JSON (implied by a .json extension)
        #[arg(long)]
        json: bool,

        /// Keep values that live across calls in $s registers
        #[arg(long)]
        saved_registers: bool,

        /// Keep registers bound until the end of the block, even for dead values
        #[arg(long)]
        no_release: bool,
    },

    /// Parse, segment and validate a program without generating code
    Check {
        /// Input TAC file
        input: PathBuf,

        /// Read the input as JSON (implied by a .json extension)
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match cli.command {
        Commands::Compile { input, output, json, saved_registers, no_release } => {
            let options = CodegenOptions {
                saved_registers,
                release_dead_values: !no_release,
            };
            compile_file(&input, output.as_deref(), json, &options)
        }
        Commands::Check { input, json } => check_file(&input, json),
    }
}

fn is_json(path: &Path, json: bool) -> bool {
    json || path.extension().is_some_and(|ext| ext == "json")
}

/// Parse program text in the requested format
fn parse_program(source: &str, json: bool) -> Result<TacProgram> {
    if json {
        TacProgram::from_json(source).context("invalid JSON TAC program")
    } else {
        Ok(source.parse::<TacProgram>()?)
    }
}

fn read_program(path: &Path, json: bool) -> Result<TacProgram> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("cannot read '{}'", path.display()))?;
    let program = parse_program(&source, is_json(path, json))?;
    info!("Read {} quad(s) from '{}'", program.len(), path.display());
    Ok(program)
}

fn compile_file(input: &Path, output: Option<&Path>, json: bool, options: &CodegenOptions) -> Result<()> {
    let program = read_program(input, json)?;
    let asm = generate_with_options(&program, options)?;

    match output {
        Some(path) => {
            fs::write(path, &asm).with_context(|| format!("cannot write '{}'", path.display()))?;
            info!("Wrote assembly to '{}'", path.display());
        }
        None => print!("{asm}"),
    }
    Ok(())
}

fn check_file(input: &Path, json: bool) -> Result<()> {
    let program = read_program(input, json)?;
    let functions = split_functions(&program)?;
    for unit in &functions {
        for (index, quad) in unit.quads.iter().enumerate() {
            validate(quad, &unit.pos(index))?;
        }
        Liveness::analyze(unit)?;
    }
    println!(
        "{}: {} quad(s) in {} function(s)",
        input.display(),
        program.len(),
        functions.len()
    );
    Ok(())
}
