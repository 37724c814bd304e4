//! # Content Subcommands
//!
//! `enforce` cleans a content-parameters document against the semantics of
//! its main library; `scan-files` lists the files it references. Both
//! resolve semantics from an installed library directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use h5p_core::VersionedName;
use h5p_semantics::{scan_files, EnforcerOptions, SemanticsEnforcer};
use serde_json::Value;

use crate::store::LibraryDirectory;

/// Arguments shared by the content subcommands.
#[derive(Args, Debug)]
pub struct ContentArgs {
    /// Content parameters file (`content.json`).
    pub params: PathBuf,

    /// Directory of installed libraries.
    #[arg(long)]
    pub libraries: PathBuf,

    /// Main library of the content, e.g. `H5P.Column 1.13`.
    #[arg(long)]
    pub library: String,
}

/// Arguments for the enforce subcommand.
#[derive(Args, Debug)]
pub struct EnforceArgs {
    #[command(flatten)]
    pub content: ContentArgs,

    /// Only check library references; leave text untouched.
    #[arg(long)]
    pub basic: bool,

    /// Write the cleaned parameters here instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Arguments for the scan-files subcommand.
#[derive(Args, Debug)]
pub struct ScanFilesArgs {
    #[command(flatten)]
    pub content: ContentArgs,

    /// Print the references as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the enforce subcommand.
///
/// Exits `0` whether or not anything was removed; the report is logged.
pub fn run_enforce(args: &EnforceArgs) -> Result<u8> {
    let (store, main, mut params) = load(&args.content)?;
    let options = EnforcerOptions {
        sanitize_text: !args.basic,
    };
    let report = SemanticsEnforcer::with_options(&store, options)
        .enforce(&mut params, &main)
        .with_context(|| format!("failed to enforce semantics of {main}"))?;

    for path in &report.removed {
        tracing::info!(path = %path, "removed");
    }
    tracing::info!(
        removed = report.removed.len(),
        modified = report.modified.len(),
        "enforcement finished"
    );

    let cleaned = serde_json::to_string_pretty(&params)?;
    match &args.output {
        Some(output) => fs::write(output, cleaned)
            .with_context(|| format!("failed to write {}", output.display()))?,
        None => println!("{cleaned}"),
    }
    Ok(0)
}

/// Execute the scan-files subcommand.
pub fn run_scan_files(args: &ScanFilesArgs) -> Result<u8> {
    let (store, main, params) = load(&args.content)?;
    let files = scan_files(&store, &params, &main)
        .with_context(|| format!("failed to scan files of {main}"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&files)?);
    } else {
        for file in &files {
            println!("{}\t{}", file.file_path, file.json_path);
        }
    }
    Ok(0)
}

fn load(args: &ContentArgs) -> Result<(LibraryDirectory, VersionedName, Value)> {
    let store = LibraryDirectory::open(&args.libraries)?;
    let main = VersionedName::parse(&args.library)
        .with_context(|| format!("invalid main library {:?}", args.library))?;
    let params = read_params(&args.params)?;
    Ok((store, main, params))
}

fn read_params(path: &Path) -> Result<Value> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}
