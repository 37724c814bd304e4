#![deny(missing_docs)]

//! # h5p-core — Foundational Types for H5P Package Handling
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It has no internal crate dependencies and uses only `serde`, `serde_json`,
//! `thiserror`, `regex`, and `once_cell` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **[`VersionedName`] is the only library identity.** Ubernames
//!    (`H5P.Example-1.0`) are parsed into it once and never compared as raw
//!    strings elsewhere.
//!
//! 2. **Version ordering is explicit about missing patches.**
//!    [`VersionedName::compare`] returns [`VersionOrdering::PatchUnknown`]
//!    instead of silently treating an absent patch as equal.
//!
//! 3. **[`ValidationErrors`] is the single accumulator.** Every package
//!    check reports through it with a stable [`IssueCode`] and a
//!    human-readable message.
//!
//! 4. **[`LibraryRegistry`] is a snapshot.** Patch, upgrade and dependent
//!    relations are recomputed on demand from the installed set; nothing
//!    derived is persisted.

pub mod accumulator;
pub mod error;
pub mod metadata;
pub mod registry;
pub mod version;

// Re-export primary types at crate root for ergonomic imports.
pub use accumulator::{ErrorMode, IssueCode, ValidationErrors, ValidationIssue};
pub use error::{NameError, RegistryError};
pub use metadata::{CoreApiVersion, FileRef, LibraryMetadata, Manifest};
pub use registry::{InstallAction, InstalledLibrary, LibraryRegistry};
pub use version::{VersionOrdering, VersionedName};
