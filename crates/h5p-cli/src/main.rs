//! # h5p CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use h5p_cli::content::{run_enforce, run_scan_files, EnforceArgs, ScanFilesArgs};
use h5p_cli::load_config;
use h5p_cli::plan::{run_plan, PlanArgs};
use h5p_cli::validate::{run_validate, ValidateArgs};

/// H5P package toolchain.
///
/// Validates uploaded packages, cleans content parameters against their
/// semantics, and plans library installation.
#[derive(Parser, Debug)]
#[command(name = "h5p", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a validator configuration file (YAML or JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a package archive.
    Validate(ValidateArgs),

    /// Remove invalid entries from content parameters and sanitize text.
    Enforce(EnforceArgs),

    /// List the files content parameters refer to.
    ScanFiles(ScanFilesArgs),

    /// Show what installing a package's libraries would do.
    Plan(PlanArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = cli.config.as_deref();
    let result = match &cli.command {
        Commands::Validate(args) => load_config(config).and_then(|c| run_validate(args, c)),
        Commands::Enforce(args) => run_enforce(args),
        Commands::ScanFiles(args) => run_scan_files(args),
        Commands::Plan(args) => load_config(config).and_then(|c| run_plan(args, c)),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
