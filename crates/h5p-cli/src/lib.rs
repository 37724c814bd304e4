//! # h5p-cli — H5P Package Command-Line Interface
//!
//! ## Subcommands
//!
//! - `validate` — archive validation of a `.h5p` package
//! - `enforce` — semantics enforcement of a content-parameters document
//! - `scan-files` — list the files content parameters refer to
//! - `plan` — what installing a package's libraries would do
//!
//! Handlers parse nothing and decide nothing themselves; they load inputs,
//! call into the domain crates and print results. Each returns the process
//! exit code.

use std::path::Path;

use anyhow::{Context, Result};
use h5p_package::ValidatorConfig;

pub mod content;
pub mod plan;
pub mod store;
pub mod validate;

/// Validator settings from `--config`, or from the environment.
pub fn load_config(path: Option<&Path>) -> Result<ValidatorConfig> {
    match path {
        Some(path) => ValidatorConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => ValidatorConfig::from_env().context("invalid validator settings in environment"),
    }
}
