//! # h5p-schema — Package Schema Validation
//!
//! Runtime JSON Schema validation for the two metadata documents an H5P
//! package carries: the package manifest `h5p.json` and each library's
//! `library.json`.
//!
//! ## Design
//!
//! The schemas are configuration, not generated at runtime. They ship in
//! `schemas/`, are compiled once into a [`PackageSchemas`] value, and that
//! value is shared by every archive validation run. Violations are
//! structured via [`SchemaError::ValidationFailed`] with the JSON Pointer
//! path to the violating field and a human-readable message.

pub mod validate;

// Re-export primary types for ergonomic imports.
pub use validate::{
    PackageSchemas, SchemaError, SchemaKind, ValidationViolations, Violation,
    LIBRARY_SCHEMA_FILE, MANIFEST_SCHEMA_FILE,
};
