//! # Library Identity
//!
//! [`VersionedName`] names one version of a library: a machine name plus
//! `major.minor`, optionally refined by a patch number. Its string form, the
//! *ubername*, is `machineName-major.minor`; the patch never appears in it.
//!
//! Content parameters reference sub-libraries as `machineName major.minor`
//! (space separated). [`VersionedName::parse`] accepts both forms.
//!
//! ## Ordering
//!
//! Versions order lexicographically on `(major, minor, patch)`. When the
//! major and minor agree but only one side knows its patch, the result is
//! [`VersionOrdering::PatchUnknown`]: the ordering is partial, and callers
//! decide what an unknown patch means for them.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::NameError;

static MACHINE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.]+$").expect("machine name regex"));
static LIBRARY_STRING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9_.]+)[- ]([0-9]+)\.([0-9]+)$").expect("library string regex")
});

/// Result of comparing two library versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOrdering {
    /// The left version is older.
    Less,
    /// Both versions are identical (patches included, when both are known).
    Equal,
    /// The left version is newer.
    Greater,
    /// Major and minor agree, but only one side carries a patch number.
    PatchUnknown,
}

impl VersionOrdering {
    /// Converts to a total [`Ordering`], or `None` when the patch is unknown.
    pub fn to_ordering(self) -> Option<Ordering> {
        match self {
            Self::Less => Some(Ordering::Less),
            Self::Equal => Some(Ordering::Equal),
            Self::Greater => Some(Ordering::Greater),
            Self::PatchUnknown => None,
        }
    }

    /// Legacy numeric form: negative, zero, positive. An unknown patch maps
    /// to zero.
    pub fn signum(self) -> i32 {
        match self {
            Self::Less => -1,
            Self::Greater => 1,
            Self::Equal | Self::PatchUnknown => 0,
        }
    }
}

impl From<Ordering> for VersionOrdering {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => Self::Less,
            Ordering::Equal => Self::Equal,
            Ordering::Greater => Self::Greater,
        }
    }
}

/// Immutable identity of a library version.
///
/// Serializes with the field names used in `library.json` dependency lists
/// (`machineName`, `majorVersion`, `minorVersion`, `patchVersion`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawVersionedName", rename_all = "camelCase")]
pub struct VersionedName {
    machine_name: String,
    major_version: u32,
    minor_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    patch_version: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVersionedName {
    machine_name: String,
    major_version: u32,
    minor_version: u32,
    #[serde(default)]
    patch_version: Option<u32>,
}

impl TryFrom<RawVersionedName> for VersionedName {
    type Error = NameError;

    fn try_from(raw: RawVersionedName) -> Result<Self, Self::Error> {
        let name = Self::new(raw.machine_name, raw.major_version, raw.minor_version)?;
        Ok(match raw.patch_version {
            Some(patch) => name.with_patch(patch),
            None => name,
        })
    }
}

impl VersionedName {
    /// Create a version without a patch number.
    ///
    /// # Errors
    ///
    /// Returns [`NameError::InvalidMachineName`] if the machine name is empty
    /// or contains characters outside `[A-Za-z0-9_.]`.
    pub fn new(machine_name: impl Into<String>, major: u32, minor: u32) -> Result<Self, NameError> {
        let machine_name = machine_name.into();
        if !MACHINE_NAME.is_match(&machine_name) {
            return Err(NameError::InvalidMachineName(machine_name));
        }
        Ok(Self {
            machine_name,
            major_version: major,
            minor_version: minor,
            patch_version: None,
        })
    }

    /// Returns the same version refined with a patch number.
    pub fn with_patch(mut self, patch: u32) -> Self {
        self.patch_version = Some(patch);
        self
    }

    /// Parse `Name-1.2` (ubername) or `Name 1.2` (content parameter form).
    pub fn parse(input: &str) -> Result<Self, NameError> {
        let caps = LIBRARY_STRING
            .captures(input.trim())
            .ok_or_else(|| NameError::InvalidUbername(input.to_string()))?;
        let major = caps[2]
            .parse()
            .map_err(|_| NameError::InvalidUbername(input.to_string()))?;
        let minor = caps[3]
            .parse()
            .map_err(|_| NameError::InvalidUbername(input.to_string()))?;
        Self::new(&caps[1], major, minor)
    }

    /// The machine name, e.g. `H5P.Example`.
    pub fn machine_name(&self) -> &str {
        &self.machine_name
    }

    /// Major version.
    pub fn major(&self) -> u32 {
        self.major_version
    }

    /// Minor version.
    pub fn minor(&self) -> u32 {
        self.minor_version
    }

    /// Patch version, if known.
    pub fn patch(&self) -> Option<u32> {
        self.patch_version
    }

    /// `machineName-major.minor`.
    pub fn ubername(&self) -> String {
        format!("{}-{}.{}", self.machine_name, self.major_version, self.minor_version)
    }

    /// `major.minor` or `major.minor.patch`.
    pub fn version_string(&self) -> String {
        match self.patch_version {
            Some(patch) => format!("{}.{}.{}", self.major_version, self.minor_version, patch),
            None => format!("{}.{}", self.major_version, self.minor_version),
        }
    }

    /// Compare versions, ignoring machine names.
    pub fn compare(&self, other: &Self) -> VersionOrdering {
        let head = (self.major_version, self.minor_version)
            .cmp(&(other.major_version, other.minor_version));
        if head != Ordering::Equal {
            return head.into();
        }
        match (self.patch_version, other.patch_version) {
            (Some(a), Some(b)) => a.cmp(&b).into(),
            (None, None) => VersionOrdering::Equal,
            _ => VersionOrdering::PatchUnknown,
        }
    }

    /// Same machine name and same `major.minor`.
    pub fn same_major_minor(&self, other: &Self) -> bool {
        self.machine_name == other.machine_name
            && self.major_version == other.major_version
            && self.minor_version == other.minor_version
    }

    /// Identity comparison: the patch is only significant when both sides
    /// carry one.
    pub fn matches(&self, other: &Self) -> bool {
        self.same_major_minor(other)
            && match (self.patch_version, other.patch_version) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
    }

    /// Whether `other` names this library version in either string form.
    pub fn matches_str(&self, other: &str) -> bool {
        Self::parse(other).is_ok_and(|parsed| self.same_major_minor(&parsed))
    }
}

impl fmt::Display for VersionedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}.{}", self.machine_name, self.major_version, self.minor_version)
    }
}

impl FromStr for VersionedName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(major: u32, minor: u32, patch: u32) -> VersionedName {
        VersionedName::new("H5P.Example", major, minor)
            .unwrap()
            .with_patch(patch)
    }

    #[test]
    fn ubername_omits_patch() {
        assert_eq!(v(1, 2, 7).ubername(), "H5P.Example-1.2");
        assert_eq!(v(1, 2, 7).to_string(), "H5P.Example-1.2");
        assert_eq!(v(1, 2, 7).version_string(), "1.2.7");
    }

    #[test]
    fn parse_accepts_both_forms() {
        let dash = VersionedName::parse("H5P.Image-1.1").unwrap();
        let space = VersionedName::parse("H5P.Image 1.1").unwrap();
        assert_eq!(dash, space);
        assert_eq!(dash.machine_name(), "H5P.Image");
        assert_eq!((dash.major(), dash.minor(), dash.patch()), (1, 1, None));
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["H5P.Image", "H5P.Image-1", "H5P Image-1.1", "-1.1", "H5P.Image-a.b", ""] {
            assert!(VersionedName::parse(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn new_rejects_invalid_machine_name() {
        assert_eq!(
            VersionedName::new("H5P-Example", 1, 0),
            Err(NameError::InvalidMachineName("H5P-Example".to_string()))
        );
        assert!(VersionedName::new("", 1, 0).is_err());
    }

    #[test]
    fn compare_orders_lexicographically() {
        assert_eq!(v(1, 2, 0).compare(&v(1, 2, 1)), VersionOrdering::Less);
        assert_eq!(v(1, 2, 1).compare(&v(1, 2, 0)), VersionOrdering::Greater);
        assert_eq!(v(1, 10, 0).compare(&v(2, 0, 0)), VersionOrdering::Less);
        assert_eq!(v(1, 10, 0).compare(&v(1, 9, 99)), VersionOrdering::Greater);
        assert_eq!(v(3, 1, 4).compare(&v(3, 1, 4)), VersionOrdering::Equal);
        assert!(v(1, 2, 0).compare(&v(1, 2, 1)).signum() < 0);
    }

    #[test]
    fn compare_with_missing_patch_is_unknown() {
        let bare = VersionedName::new("H5P.Example", 1, 2).unwrap();
        let ordering = bare.compare(&v(1, 2, 5));
        assert_eq!(ordering, VersionOrdering::PatchUnknown);
        assert_eq!(ordering.to_ordering(), None);
        assert_eq!(ordering.signum(), 0);
        // Major/minor still decide when they differ.
        assert_eq!(bare.compare(&v(1, 3, 0)), VersionOrdering::Less);
    }

    #[test]
    fn matches_ignores_patch_unless_both_present() {
        let bare = VersionedName::new("H5P.Example", 1, 2).unwrap();
        assert!(bare.matches(&v(1, 2, 3)));
        assert!(v(1, 2, 3).matches(&v(1, 2, 3)));
        assert!(!v(1, 2, 3).matches(&v(1, 2, 4)));
        assert!(!bare.matches(&v(1, 3, 0)));
    }

    #[test]
    fn matches_str_accepts_content_form() {
        assert!(v(1, 2, 0).matches_str("H5P.Example 1.2"));
        assert!(v(1, 2, 0).matches_str("H5P.Example-1.2"));
        assert!(!v(1, 2, 0).matches_str("H5P.Other 1.2"));
        assert!(!v(1, 2, 0).matches_str("garbage"));
    }

    #[test]
    fn serde_uses_library_json_field_names() {
        let json = serde_json::json!({
            "machineName": "H5P.Question",
            "majorVersion": 1,
            "minorVersion": 4
        });
        let name: VersionedName = serde_json::from_value(json).unwrap();
        assert_eq!(name.ubername(), "H5P.Question-1.4");
        let back = serde_json::to_value(&name).unwrap();
        assert!(back.get("patchVersion").is_none());
    }

    #[test]
    fn serde_rejects_invalid_machine_name() {
        let json = serde_json::json!({
            "machineName": "bad name",
            "majorVersion": 1,
            "minorVersion": 0
        });
        assert!(serde_json::from_value::<VersionedName>(json).is_err());
    }
}
