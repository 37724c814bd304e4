//! # Plan Subcommand
//!
//! Validates a package and reports, for each library it carries, what
//! installing it next to an existing library directory would do.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use h5p_core::{InstallAction, LibraryRegistry, VersionedName};
use h5p_package::{ArchiveValidator, PackageError, ValidatorConfig};

use crate::store::LibraryDirectory;

/// Arguments for the plan subcommand.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Package file to plan.
    pub package: PathBuf,

    /// Directory of installed libraries.
    #[arg(long)]
    pub libraries: PathBuf,
}

/// One line of an install plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    /// The library carried by the package.
    pub candidate: VersionedName,
    /// What installing it would do.
    pub action: InstallAction,
    /// Installed versions of the same library it supersedes.
    pub upgrades: Vec<VersionedName>,
}

/// Execute the plan subcommand.
///
/// Exits `1` when the package is invalid.
pub fn run_plan(args: &PlanArgs, config: ValidatorConfig) -> Result<u8> {
    let validator = ArchiveValidator::new(config).context("failed to load package schemas")?;
    let package = match validator.validate(&args.package, false, true) {
        Ok(package) => package,
        Err(PackageError::Invalid(errors)) => {
            println!("{} is not a valid package:", args.package.display());
            for message in errors.messages() {
                println!("  - {message}");
            }
            return Ok(1);
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to validate {}", args.package.display()))
        }
    };

    let registry = LibraryDirectory::open(&args.libraries)?.registry()?;
    let candidates = package
        .libraries
        .iter()
        .map(|library| library.versioned_name())
        .collect::<Result<Vec<_>, _>>()?;

    for step in plan(&registry, candidates) {
        println!("{}", describe(&step));
    }
    Ok(0)
}

/// Plan the installation of `candidates` against `registry`.
pub fn plan(registry: &LibraryRegistry, candidates: Vec<VersionedName>) -> Vec<PlanStep> {
    candidates
        .into_iter()
        .map(|candidate| PlanStep {
            action: registry.plan_install(&candidate),
            upgrades: registry
                .upgrades_for(&candidate)
                .into_iter()
                .cloned()
                .collect(),
            candidate,
        })
        .collect()
}

fn describe(step: &PlanStep) -> String {
    let name = &step.candidate;
    let mut line = match &step.action {
        InstallAction::Install => format!("install {name} ({})", name.version_string()),
        InstallAction::Patch { installed } => format!(
            "patch   {name} ({} -> {})",
            installed.version_string(),
            name.version_string()
        ),
        InstallAction::Skip { installed } => format!(
            "skip    {name} ({} installed)",
            installed.version_string()
        ),
    };
    if !step.upgrades.is_empty() {
        let upgraded: Vec<String> = step.upgrades.iter().map(ToString::to_string).collect();
        line.push_str(&format!(", upgrades {}", upgraded.join(", ")));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use h5p_core::InstalledLibrary;

    fn name(s: &str, patch: u32) -> VersionedName {
        VersionedName::parse(s).unwrap().with_patch(patch)
    }

    #[test]
    fn plan_covers_every_action() {
        let registry = LibraryRegistry::from_libraries([
            InstalledLibrary::new(name("H5P.Text-1.0", 2)),
            InstalledLibrary::new(name("H5P.Image-1.1", 5)),
        ]);
        let steps = plan(
            &registry,
            vec![
                name("H5P.Text-1.1", 0),
                name("H5P.Image-1.1", 6),
                name("H5P.Image-1.1", 5),
            ],
        );

        assert_eq!(steps[0].action, InstallAction::Install);
        assert_eq!(steps[0].upgrades, vec![name("H5P.Text-1.0", 2)]);
        assert_eq!(
            steps[1].action,
            InstallAction::Patch {
                installed: name("H5P.Image-1.1", 5)
            }
        );
        assert!(matches!(steps[2].action, InstallAction::Skip { .. }));
        assert!(steps[2].upgrades.is_empty());
    }

    #[test]
    fn describe_mentions_versions() {
        let step = PlanStep {
            candidate: name("H5P.Image-1.1", 6),
            action: InstallAction::Patch {
                installed: name("H5P.Image-1.1", 5),
            },
            upgrades: vec![],
        };
        assert_eq!(describe(&step), "patch   H5P.Image-1.1 (1.1.5 -> 1.1.6)");

        let step = PlanStep {
            candidate: name("H5P.Text-1.1", 0),
            action: InstallAction::Install,
            upgrades: vec![name("H5P.Text-1.0", 2)],
        };
        assert_eq!(describe(&step), "install H5P.Text-1.1 (1.1.0), upgrades H5P.Text-1.0");
    }
}
