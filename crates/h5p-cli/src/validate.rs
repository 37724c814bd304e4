//! # Validate Subcommand
//!
//! Runs the archive validator over a package file and prints either a
//! summary of the package or every issue found.
//!
//! Exit codes: `0` valid, `1` invalid. Operational failures (unreadable
//! file, broken schemas) are errors.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use h5p_package::{ArchiveValidator, PackageError, ValidatedPackage, ValidatorConfig};
use serde_json::json;

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Package file to validate.
    pub package: PathBuf,

    /// Skip content checks (manifest, content file whitelist).
    #[arg(long)]
    pub skip_content: bool,

    /// Skip library checks.
    #[arg(long)]
    pub skip_libraries: bool,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the validate subcommand.
pub fn run_validate(args: &ValidateArgs, config: ValidatorConfig) -> Result<u8> {
    let validator = ArchiveValidator::new(config).context("failed to load package schemas")?;
    let result = validator.validate(&args.package, !args.skip_content, !args.skip_libraries);

    match result {
        Ok(package) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary_json(&package))?);
            } else {
                print_summary(&args.package, &package);
            }
            Ok(0)
        }
        Err(PackageError::Invalid(errors)) => {
            if args.json {
                let report = json!({"valid": false, "issues": errors.issues()});
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{} is not a valid package:", args.package.display());
                for message in errors.messages() {
                    println!("  - {message}");
                }
            }
            Ok(1)
        }
        Err(err) => {
            Err(err).with_context(|| format!("failed to validate {}", args.package.display()))
        }
    }
}

fn summary_json(package: &ValidatedPackage) -> serde_json::Value {
    json!({
        "valid": true,
        "manifest": package.manifest,
        "libraries": package
            .libraries
            .iter()
            .map(|library| json!({
                "name": library.ubername(),
                "patchVersion": library.patch_version,
            }))
            .collect::<Vec<_>>(),
    })
}

fn print_summary(path: &std::path::Path, package: &ValidatedPackage) {
    println!("{} is valid", path.display());
    if let Some(manifest) = &package.manifest {
        println!("  title:        {}", manifest.title);
        println!("  main library: {}", manifest.main_library);
    }
    for library in &package.libraries {
        println!(
            "  library:      {} (patch {})",
            library.ubername(),
            library.patch_version
        );
    }
}
