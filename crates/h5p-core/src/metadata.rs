//! # Package and Library Metadata
//!
//! Typed views of the two metadata documents a package carries:
//!
//! - [`Manifest`]: the package-level `h5p.json`.
//! - [`LibraryMetadata`]: each library's `library.json`.
//!
//! Both are deserialized only after JSON-schema validation has passed, so
//! the typed layer stays lenient about optional fields and keeps unknown
//! keys in an `extra` map.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::NameError;
use crate::version::VersionedName;

/// The core API version a library requires, or the runtime provides.
///
/// Ordered lexicographically on `(major, minor)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoreApiVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
}

impl CoreApiVersion {
    /// Create a version.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for CoreApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for CoreApiVersion {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || NameError::InvalidCoreApi(s.to_string());
        let (major, minor) = s.trim().split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

/// A file path listed in `preloadedJs` / `preloadedCss`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// Path relative to the library directory.
    pub path: String,
}

/// Package manifest (`h5p.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Content title.
    pub title: String,
    /// Machine name of the library that renders the content.
    pub main_library: String,
    /// Content language code.
    pub language: String,
    /// Libraries that must be loaded to render the content.
    #[serde(default)]
    pub preloaded_dependencies: Vec<VersionedName>,
    /// Supported embed types (`div`, `iframe`).
    #[serde(default)]
    pub embed_types: Vec<String>,
    /// License identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Any other manifest keys, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
    /// The preloaded dependency that names the main library, if listed.
    pub fn main_library_dependency(&self) -> Option<&VersionedName> {
        self.preloaded_dependencies
            .iter()
            .find(|dep| dep.machine_name() == self.main_library)
    }
}

/// Library metadata (`library.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryMetadata {
    /// Human-readable title.
    pub title: String,
    /// Machine name, e.g. `H5P.Example`.
    pub machine_name: String,
    /// Major version.
    pub major_version: u32,
    /// Minor version.
    pub minor_version: u32,
    /// Patch version.
    pub patch_version: u32,
    /// Whether the library can be the main library of content.
    #[serde(deserialize_with = "bool_or_int", default)]
    pub runnable: bool,
    /// Minimum core API the library needs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_api: Option<CoreApiVersion>,
    /// JavaScript files loaded with the library.
    #[serde(default)]
    pub preloaded_js: Vec<FileRef>,
    /// Stylesheets loaded with the library.
    #[serde(default)]
    pub preloaded_css: Vec<FileRef>,
    /// Libraries loaded before this one.
    #[serde(default)]
    pub preloaded_dependencies: Vec<VersionedName>,
    /// Libraries needed only by the editor.
    #[serde(default)]
    pub editor_dependencies: Vec<VersionedName>,
    /// Libraries loaded on demand.
    #[serde(default)]
    pub dynamic_dependencies: Vec<VersionedName>,
    /// Any other metadata keys, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LibraryMetadata {
    /// Identity of this library, patch included.
    pub fn versioned_name(&self) -> Result<VersionedName, NameError> {
        Ok(
            VersionedName::new(&self.machine_name, self.major_version, self.minor_version)?
                .with_patch(self.patch_version),
        )
    }

    /// `machineName-major.minor`, without validating the machine name.
    pub fn ubername(&self) -> String {
        format!("{}-{}.{}", self.machine_name, self.major_version, self.minor_version)
    }

    /// All dependencies of every kind.
    pub fn all_dependencies(&self) -> impl Iterator<Item = &VersionedName> {
        self.preloaded_dependencies
            .iter()
            .chain(&self.editor_dependencies)
            .chain(&self.dynamic_dependencies)
    }

    /// Every preloaded JavaScript and CSS path.
    pub fn preloaded_files(&self) -> impl Iterator<Item = &str> {
        self.preloaded_js
            .iter()
            .chain(&self.preloaded_css)
            .map(|f| f.path.as_str())
    }
}

/// `runnable` and similar flags appear as booleans or as `0` / `1`.
fn bool_or_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_i64().is_some_and(|v| v != 0)),
        other => Err(serde::de::Error::custom(format!(
            "expected boolean or 0/1, got {other}"
        ))),
    }
}
