//! # Schema Validation
//!
//! Validation of `h5p.json` and `library.json` documents against their
//! fixed JSON Schema definitions (Draft 7).
//!
//! ## Trust boundary
//!
//! Both documents arrive inside an uploaded archive. Nothing reads typed
//! fields out of them until they have passed validation here; violations are
//! reported with the JSON Pointer of the offending field and a readable
//! message.
//!
//! ## Loading
//!
//! The schemas ship with the crate (`schemas/*.schema.json`) and are
//! compiled once by [`PackageSchemas::builtin`]. Deployments that pin their
//! own copies use [`PackageSchemas::from_dir`]. Compiled validators are
//! `Send + Sync` and are shared across validation runs.

use std::fmt;
use std::path::Path;

use jsonschema::{Draft, Validator};
use serde_json::Value;
use thiserror::Error;

const MANIFEST_SCHEMA: &str = include_str!("../schemas/h5p.schema.json");
const LIBRARY_SCHEMA: &str = include_str!("../schemas/library.schema.json");

/// File name of the manifest schema inside a schema directory.
pub const MANIFEST_SCHEMA_FILE: &str = "h5p.schema.json";
/// File name of the library metadata schema inside a schema directory.
pub const LIBRARY_SCHEMA_FILE: &str = "library.schema.json";

/// Which document a schema describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// The package manifest, `h5p.json`.
    Manifest,
    /// A library's `library.json`.
    Library,
}

impl SchemaKind {
    /// Schema file name for this kind.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Manifest => MANIFEST_SCHEMA_FILE,
            Self::Library => LIBRARY_SCHEMA_FILE,
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Error during schema loading or validation.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The document did not conform to the schema.
    #[error("validation failed against schema '{schema}':\n{violations}")]
    ValidationFailed {
        /// Which schema was violated.
        schema: SchemaKind,
        /// Structured list of individual violations.
        violations: ValidationViolations,
    },

    /// The schema file could not be read or parsed.
    #[error("schema load error for '{schema_name}': {reason}")]
    SchemaLoadError {
        /// Schema filename or identifier.
        schema_name: String,
        /// Reason the schema could not be loaded.
        reason: String,
    },

    /// The compiled validator could not be built (e.g., invalid schema).
    #[error("validator build error for schema '{schema_name}': {reason}")]
    ValidatorBuildError {
        /// Schema filename or identifier.
        schema_name: String,
        /// Reason the validator could not be built.
        reason: String,
    },

    /// IO error reading a schema file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SchemaError {
    /// Violations, when this is a validation failure.
    pub fn violations(&self) -> Option<&ValidationViolations> {
        match self {
            Self::ValidationFailed { violations, .. } => Some(violations),
            _ => None,
        }
    }
}

/// A single validation violation with structured context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// JSON Pointer path to the violating field in the instance.
    pub instance_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

/// Collection of validation violations.
#[derive(Debug, Clone)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns a slice of all violations.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {v}")?;
        }
        Ok(())
    }
}

/// The compiled manifest and library metadata schemas.
pub struct PackageSchemas {
    manifest: Validator,
    library: Validator,
}

impl fmt::Debug for PackageSchemas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageSchemas").finish_non_exhaustive()
    }
}

impl PackageSchemas {
    /// Compile the schemas bundled with this crate.
    pub fn builtin() -> Result<Self, SchemaError> {
        let manifest = parse_schema(MANIFEST_SCHEMA_FILE, MANIFEST_SCHEMA)?;
        let library = parse_schema(LIBRARY_SCHEMA_FILE, LIBRARY_SCHEMA)?;
        Self::from_values(&manifest, &library)
    }

    /// Load `h5p.schema.json` and `library.schema.json` from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::SchemaLoadError`] if either file is missing or
    /// is not JSON, and [`SchemaError::ValidatorBuildError`] if either is not
    /// a valid schema.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let dir = dir.as_ref();
        let load = |file: &str| -> Result<Value, SchemaError> {
            let path = dir.join(file);
            let content =
                std::fs::read_to_string(&path).map_err(|e| SchemaError::SchemaLoadError {
                    schema_name: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            parse_schema(file, &content)
        };
        let manifest = load(MANIFEST_SCHEMA_FILE)?;
        let library = load(LIBRARY_SCHEMA_FILE)?;
        tracing::debug!(dir = %dir.display(), "loaded package schemas from directory");
        Self::from_values(&manifest, &library)
    }

    /// Compile schemas from already-parsed documents.
    pub fn from_values(manifest: &Value, library: &Value) -> Result<Self, SchemaError> {
        Ok(Self {
            manifest: compile(MANIFEST_SCHEMA_FILE, manifest)?,
            library: compile(LIBRARY_SCHEMA_FILE, library)?,
        })
    }

    /// Validate a document against the schema for `kind`.
    ///
    /// Returns `Ok(())` if the value is valid, or
    /// [`SchemaError::ValidationFailed`] carrying every violation.
    pub fn validate(&self, kind: SchemaKind, document: &Value) -> Result<(), SchemaError> {
        let validator = match kind {
            SchemaKind::Manifest => &self.manifest,
            SchemaKind::Library => &self.library,
        };

        let violations: Vec<Violation> = validator
            .iter_errors(document)
            .map(|err| Violation {
                instance_path: err.instance_path.to_string(),
                message: err.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::ValidationFailed {
                schema: kind,
                violations: ValidationViolations { violations },
            })
        }
    }

    /// Validate a package manifest (`h5p.json`).
    pub fn validate_manifest(&self, document: &Value) -> Result<(), SchemaError> {
        self.validate(SchemaKind::Manifest, document)
    }

    /// Validate library metadata (`library.json`).
    pub fn validate_library(&self, document: &Value) -> Result<(), SchemaError> {
        self.validate(SchemaKind::Library, document)
    }

    /// Cheap boolean check, no violation details.
    pub fn is_valid(&self, kind: SchemaKind, document: &Value) -> bool {
        match kind {
            SchemaKind::Manifest => self.manifest.is_valid(document),
            SchemaKind::Library => self.library.is_valid(document),
        }
    }
}

fn parse_schema(name: &str, content: &str) -> Result<Value, SchemaError> {
    serde_json::from_str(content).map_err(|e| SchemaError::SchemaLoadError {
        schema_name: name.to_string(),
        reason: format!("invalid JSON: {e}"),
    })
}

fn compile(name: &str, schema: &Value) -> Result<Validator, SchemaError> {
    jsonschema::options()
        .with_draft(Draft::Draft7)
        .build(schema)
        .map_err(|e| SchemaError::ValidatorBuildError {
            schema_name: name.to_string(),
            reason: e.to_string(),
        })
}
