//! # Installed Library Directory
//!
//! Reads the libraries installed under a directory laid out the way an
//! unpacked package lays them out:
//!
//! ```text
//! libraries/
//!   H5P.Image-1.1/
//!     library.json
//!     semantics.json
//!   H5P.Text-1.2/
//!     library.json
//! ```
//!
//! The registry is built eagerly from every `library.json`. Semantics are
//! read on demand, so a directory can serve as a [`SemanticsSource`].

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use h5p_core::{InstalledLibrary, LibraryMetadata, LibraryRegistry, VersionedName};
use h5p_semantics::{
    parse_semantics_str, SemanticField, SemanticsError, SemanticsResult, SemanticsSource,
};

const METADATA_FILE: &str = "library.json";
const SEMANTICS_FILE: &str = "semantics.json";

/// A directory of installed libraries.
#[derive(Debug, Clone)]
pub struct LibraryDirectory {
    root: PathBuf,
}

impl LibraryDirectory {
    /// Use `root` as the library directory. It must exist.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            bail!("library directory {} does not exist", root.display());
        }
        Ok(Self { root })
    }

    /// The directory itself.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `library` is (or would be) installed.
    pub fn library_path(&self, library: &VersionedName) -> PathBuf {
        self.root.join(library.ubername())
    }

    /// Parse one library's `library.json`.
    pub fn read_metadata(&self, library_dir: &Path) -> Result<LibraryMetadata> {
        let path = library_dir.join(METADATA_FILE);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Build a registry from every installed library.
    ///
    /// Subdirectories without `library.json`, or whose name does not match
    /// the metadata, are skipped with a warning.
    pub fn registry(&self) -> Result<LibraryRegistry> {
        let mut dirs: Vec<PathBuf> = fs::read_dir(&self.root)
            .with_context(|| format!("failed to list {}", self.root.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        let mut registry = LibraryRegistry::new();
        for dir in dirs {
            let dir_name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !dir.join(METADATA_FILE).is_file() {
                tracing::debug!(directory = %dir_name, "skipping directory without library.json");
                continue;
            }
            let metadata = self.read_metadata(&dir)?;
            if metadata.ubername() != dir_name {
                tracing::warn!(
                    directory = %dir_name,
                    library = %metadata.ubername(),
                    "library directory does not match its metadata, skipping"
                );
                continue;
            }
            let library = InstalledLibrary::from_metadata(&metadata)
                .with_context(|| format!("invalid library name in {dir_name}"))?;
            registry.register(library);
        }
        tracing::info!(libraries = registry.len(), root = %self.root.display(), "loaded library registry");
        Ok(registry)
    }
}

impl SemanticsSource for LibraryDirectory {
    fn semantics(&self, library: &VersionedName) -> SemanticsResult<Option<Cow<'_, [SemanticField]>>> {
        let path = self.library_path(library).join(SEMANTICS_FILE);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(SemanticsError::Source {
                    library: library.ubername(),
                    reason: err.to_string(),
                })
            }
        };
        Ok(Some(Cow::Owned(parse_semantics_str(&text)?)))
    }
}
