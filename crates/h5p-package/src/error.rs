//! Package-validation error types.
//!
//! Two levels, kept apart on purpose:
//!
//! - [`PackageError::Invalid`]: the package is structurally wrong. Carries
//!   the accumulated [`ValidationErrors`] for display to the uploader.
//! - Everything else: the validator itself could not do its job (the
//!   archive file could not be opened from disk, schemas failed to load).
//!   These propagate unchanged and are never folded into the issue list.

use std::path::PathBuf;

use h5p_core::ValidationErrors;
use thiserror::Error;

/// Errors that can occur while validating a package.
#[derive(Debug, Error)]
pub enum PackageError {
    /// The package failed validation.
    #[error("package validation failed with {count} error(s):\n{0}", count = .0.len())]
    Invalid(ValidationErrors),

    /// The archive file could not be opened.
    #[error("failed to open package {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Schema loading or compilation failed.
    #[error("schema error: {0}")]
    Schema(#[from] h5p_schema::SchemaError),

    /// I/O error outside the archive's own entries.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackageError {
    /// The accumulated issues, if this is a validation failure.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Invalid(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Result type alias for package operations.
pub type PackageResult<T> = Result<T, PackageError>;
