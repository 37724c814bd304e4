//! # h5p-package — Package Validation
//!
//! Checks an uploaded H5P package (a zip archive with a manifest, content
//! parameters, and library directories) before anything is installed.
//!
//! ## Structure
//!
//! - [`chain`]: the generic [`RuleChain`] pipeline and its [`StepOutcome`].
//! - [`archive`]: the [`PackageArchive`] abstraction and its zip adapter.
//! - [`validator`]: the package-level chain ([`ArchiveValidator`]).
//! - `library`: the per-library sub-chain run for each library directory.
//! - [`config`]: limits, whitelists and the running core API version.
//!
//! ## Errors
//!
//! A package that fails validation yields [`PackageError::Invalid`] with
//! every collected issue. Operational failures (the file cannot be opened,
//! schemas fail to load) use the other [`PackageError`] variants.
//!
//! ```no_run
//! use std::path::Path;
//! use h5p_package::{ArchiveValidator, ValidatorConfig};
//!
//! let validator = ArchiveValidator::new(ValidatorConfig::default())?;
//! match validator.validate(Path::new("upload.h5p"), true, true) {
//!     Ok(package) => println!("{} libraries", package.libraries.len()),
//!     Err(err) => eprintln!("{err}"),
//! }
//! # Ok::<(), h5p_package::PackageError>(())
//! ```

pub mod archive;
pub mod chain;
pub mod config;
pub mod error;
mod library;
pub mod rules;
pub mod validator;

pub use archive::{ArchiveEntry, PackageArchive, ZipPackage};
pub use chain::{throw_errors_now, RuleChain, StepOutcome};
pub use config::{ConfigError, ValidatorConfig};
pub use error::{PackageError, PackageResult};
pub use rules::{file_must_exist, ArchiveView, Severity};
pub use validator::{ArchiveValidator, ValidatedPackage, CONTENT_DIR, CONTENT_FILE, MANIFEST_FILE};
