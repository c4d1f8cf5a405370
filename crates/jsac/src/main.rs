//! The jsa compiler CLI.
//!
//! Provides the `jsac` command with one subcommand:
//!
//! - `jsac build <dir>` -- compile a jsa project to a native binary
//!
//! Options:
//! - `--opt-level` -- optimization level (0 = debug, 2 = release)
//! - `--emit-llvm` -- emit LLVM IR (`.ll`) alongside the binary
//! - `--output` -- output path for the compiled binary
//! - `--target` -- target triple for cross-compilation
//! - `--json-diagnostics` -- render diagnostics as JSON instead of ariadne snippets

mod config;
mod diagnostics;
mod parser;
mod pipeline;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "jsac", version, about = "The jsa compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a jsa project to a native binary
    Build {
        /// Path to the project directory (looks for jsa.toml, falls back to main.jsa)
        dir: PathBuf,

        /// Optimization level (0 = debug, 2 = release)
        #[arg(long = "opt-level", default_value = "0")]
        opt_level: u8,

        /// Emit LLVM IR (.ll file) alongside the binary
        #[arg(long = "emit-llvm")]
        emit_llvm: bool,

        /// Output path for the compiled binary
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target triple for cross-compilation (e.g. x86_64-unknown-linux-gnu)
        #[arg(long)]
        target: Option<String>,

        /// Render diagnostics as JSON instead of ariadne-rendered snippets
        #[arg(long = "json-diagnostics")]
        json_diagnostics: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { dir, opt_level, emit_llvm, output, target, json_diagnostics } => {
            let (project_root, manifest) = match config::load_project(&dir) {
                Ok(pair) => pair,
                Err(e) => {
                    eprintln!("error: {e}");
                    process::exit(1);
                }
            };

            let opts = pipeline::BuildOptions { opt_level, emit_llvm, output: output.as_deref(), target: target.as_deref(), json_diagnostics };

            if let Err(e) = pipeline::build(&project_root, &manifest, opts) {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
    }
}
