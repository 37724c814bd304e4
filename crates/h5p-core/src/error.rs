//! # Error Hierarchy
//!
//! Structured error types for the core crate, built with `thiserror`.
//! Package validation failures are not errors in this sense: they are
//! collected in [`ValidationErrors`](crate::ValidationErrors) and surfaced
//! as data. The types here cover malformed identities and registry misuse.

use thiserror::Error;

/// Validation errors for library identities.
///
/// Each variant carries the rejected input so that the message can be shown
/// to the person who uploaded the package.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// Machine name contains characters outside `[A-Za-z0-9_.]`.
    #[error("invalid machine name: \"{0}\" (expected letters, digits, '_' or '.')")]
    InvalidMachineName(String),

    /// Ubername does not have the `<machineName>-<major>.<minor>` shape.
    #[error("invalid library name: \"{0}\" (expected <machineName>-<major>.<minor>)")]
    InvalidUbername(String),

    /// Core API version string is not `<major>.<minor>`.
    #[error("invalid core API version: \"{0}\" (expected <major>.<minor>)")]
    InvalidCoreApi(String),
}

/// Errors raised by [`LibraryRegistry`](crate::LibraryRegistry) mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The library is not part of the registry snapshot.
    #[error("library {0} is not installed")]
    NotInstalled(String),

    /// The library cannot be removed while other libraries depend on it.
    #[error("library {name} is still required by {count} installed library(ies)")]
    HasDependents {
        /// Ubername of the library that was to be removed.
        name: String,
        /// Number of installed libraries that depend on it.
        count: usize,
    },
}
