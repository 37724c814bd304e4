//! # Installed-Library Registry
//!
//! A snapshot of the libraries installed on the platform, answering the
//! questions package installation asks:
//!
//! - is this version installed ([`LibraryRegistry::is_installed`])
//! - is a candidate a patch of an installed version
//!   ([`LibraryRegistry::is_patch`])
//! - does a candidate upgrade what is installed
//!   ([`LibraryRegistry::has_upgrade`])
//! - how many installed libraries depend on a version
//!   ([`LibraryRegistry::dependents_count`])
//!
//! Every relation is recomputed from the installed set on demand. Writers
//! to the backing store serialize among themselves (one installer per
//! library name); the registry itself performs no locking.

use std::collections::BTreeMap;

use crate::error::{NameError, RegistryError};
use crate::metadata::LibraryMetadata;
use crate::version::{VersionOrdering, VersionedName};

/// One installed library version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledLibrary {
    /// Identity, patch included.
    pub name: VersionedName,
    /// Restricted libraries may only be used by privileged authors.
    pub restricted: bool,
    /// Whether the library can be the main library of content.
    pub runnable: bool,
    /// Every library this one depends on (preloaded, editor, dynamic).
    pub dependencies: Vec<VersionedName>,
}

impl InstalledLibrary {
    /// An unrestricted, non-runnable library without dependencies.
    pub fn new(name: VersionedName) -> Self {
        Self {
            name,
            restricted: false,
            runnable: false,
            dependencies: Vec::new(),
        }
    }

    /// Build the registry record for a library described by `library.json`.
    pub fn from_metadata(metadata: &LibraryMetadata) -> Result<Self, NameError> {
        Ok(Self {
            name: metadata.versioned_name()?,
            restricted: false,
            runnable: metadata.runnable,
            dependencies: metadata.all_dependencies().cloned().collect(),
        })
    }

    /// Builder-style dependency addition.
    pub fn depends_on(mut self, dependency: VersionedName) -> Self {
        self.dependencies.push(dependency);
        self
    }
}

/// What installing a candidate library would do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallAction {
    /// No version with this `major.minor` is installed.
    Install,
    /// Same `major.minor` installed with a lower patch; files are replaced.
    Patch {
        /// The version being replaced.
        installed: VersionedName,
    },
    /// Same or newer patch already installed (or patch unknown).
    Skip {
        /// The version already present.
        installed: VersionedName,
    },
}

// ---------------------------------------------------------------------------
// Library Registry
// ---------------------------------------------------------------------------

/// Snapshot of installed libraries, grouped by machine name.
#[derive(Debug, Clone, Default)]
pub struct LibraryRegistry {
    libraries: BTreeMap<String, Vec<InstalledLibrary>>,
}

impl LibraryRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry containing `libraries`; later entries replace earlier ones
    /// with the same `major.minor`.
    pub fn from_libraries(libraries: impl IntoIterator<Item = InstalledLibrary>) -> Self {
        let mut registry = Self::new();
        for library in libraries {
            registry.register(library);
        }
        registry
    }

    /// Add or replace the record for `library`'s `major.minor`.
    ///
    /// Returns the record that was replaced, if any.
    pub fn register(&mut self, library: InstalledLibrary) -> Option<InstalledLibrary> {
        let versions = self
            .libraries
            .entry(library.name.machine_name().to_string())
            .or_default();
        match versions
            .iter_mut()
            .find(|v| v.name.same_major_minor(&library.name))
        {
            Some(existing) => Some(std::mem::replace(existing, library)),
            None => {
                versions.push(library);
                None
            }
        }
    }

    /// Remove the record for `name`'s `major.minor`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotInstalled`] if no such version exists and
    /// [`RegistryError::HasDependents`] while other libraries depend on it.
    pub fn unregister(&mut self, name: &VersionedName) -> Result<InstalledLibrary, RegistryError> {
        let count = self.dependents_count(name);
        if count > 0 {
            return Err(RegistryError::HasDependents {
                name: name.ubername(),
                count,
            });
        }
        let versions = self
            .libraries
            .get_mut(name.machine_name())
            .ok_or_else(|| RegistryError::NotInstalled(name.ubername()))?;
        let index = versions
            .iter()
            .position(|v| v.name.same_major_minor(name))
            .ok_or_else(|| RegistryError::NotInstalled(name.ubername()))?;
        let removed = versions.remove(index);
        if versions.is_empty() {
            self.libraries.remove(name.machine_name());
        }
        Ok(removed)
    }

    /// Installed record matching `name` (patch significant only if both
    /// sides carry one).
    pub fn get(&self, name: &VersionedName) -> Option<&InstalledLibrary> {
        self.versions(name.machine_name())
            .iter()
            .find(|v| v.name.matches(name))
    }

    /// Every installed version of `machine_name`.
    pub fn versions(&self, machine_name: &str) -> &[InstalledLibrary] {
        self.libraries
            .get(machine_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All installed libraries, ordered by machine name.
    pub fn iter(&self) -> impl Iterator<Item = &InstalledLibrary> {
        self.libraries.values().flatten()
    }

    /// Number of installed library versions.
    pub fn len(&self) -> usize {
        self.libraries.values().map(Vec::len).sum()
    }

    /// No libraries installed.
    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    /// Whether `name` is installed.
    pub fn is_installed(&self, name: &VersionedName) -> bool {
        self.get(name).is_some()
    }

    /// Whether `candidate` patches an installed version: same `major.minor`
    /// with a strictly greater patch. Unknown patches never count.
    pub fn is_patch(&self, candidate: &VersionedName) -> bool {
        self.versions(candidate.machine_name()).iter().any(|installed| {
            installed.name.same_major_minor(candidate)
                && candidate.compare(&installed.name) == VersionOrdering::Greater
        })
    }

    /// Whether `candidate`'s `major.minor` is strictly greater than the
    /// highest installed `major.minor` of the same machine name. Patches are
    /// ignored; with nothing installed there is nothing to upgrade.
    pub fn has_upgrade(&self, candidate: &VersionedName) -> bool {
        self.highest_version(candidate.machine_name())
            .is_some_and(|highest| {
                (candidate.major(), candidate.minor()) > (highest.major(), highest.minor())
            })
    }

    /// Installed versions that `candidate` would upgrade.
    pub fn upgrades_for(&self, candidate: &VersionedName) -> Vec<&VersionedName> {
        self.versions(candidate.machine_name())
            .iter()
            .map(|installed| &installed.name)
            .filter(|installed| {
                (candidate.major(), candidate.minor()) > (installed.major(), installed.minor())
            })
            .collect()
    }

    /// Highest installed `major.minor` of `machine_name`.
    pub fn highest_version(&self, machine_name: &str) -> Option<&VersionedName> {
        self.versions(machine_name)
            .iter()
            .map(|installed| &installed.name)
            .max_by_key(|name| (name.major(), name.minor()))
    }

    /// Number of installed libraries that depend on `name`'s `major.minor`.
    pub fn dependents_count(&self, name: &VersionedName) -> usize {
        self.dependents(name).len()
    }

    /// Installed libraries that depend on `name`'s `major.minor`.
    pub fn dependents(&self, name: &VersionedName) -> Vec<&VersionedName> {
        self.iter()
            .filter(|library| {
                library
                    .dependencies
                    .iter()
                    .any(|dep| dep.same_major_minor(name))
            })
            .map(|library| &library.name)
            .collect()
    }

    /// Decide how a candidate from an uploaded package would be installed.
    pub fn plan_install(&self, candidate: &VersionedName) -> InstallAction {
        let installed = self
            .versions(candidate.machine_name())
            .iter()
            .find(|v| v.name.same_major_minor(candidate));
        match installed {
            None => InstallAction::Install,
            Some(existing) if self.is_patch(candidate) => InstallAction::Patch {
                installed: existing.name.clone(),
            },
            Some(existing) => InstallAction::Skip {
                installed: existing.name.clone(),
            },
        }
    }
}
