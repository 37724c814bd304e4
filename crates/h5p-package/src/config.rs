//! Validator configuration.
//!
//! Defaults mirror what a stock H5P server accepts. Override via
//! environment variables, a YAML/JSON file, or explicit construction.

use std::collections::BTreeSet;
use std::path::Path;

use h5p_core::CoreApiVersion;
use serde::{Deserialize, Serialize};

/// Extensions accepted anywhere in a package.
pub const DEFAULT_CONTENT_WHITELIST: &str = "json png jpg jpeg gif bmp tif tiff svg eot ttf woff \
     woff2 otf webm mp4 ogg mp3 m4a wav txt pdf rtf doc docx xls xlsx ppt pptx odt ods odp xml \
     csv diff patch swf md textile vtt webvtt";

/// Extensions additionally accepted outside `content/`.
pub const DEFAULT_LIBRARY_WHITELIST: &str = "js css";

/// Per-file uncompressed size limit (16 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Total uncompressed size limit (64 MiB).
pub const DEFAULT_MAX_TOTAL_SIZE: u64 = 64 * 1024 * 1024;

/// Core API version this runtime provides.
pub const DEFAULT_CORE_API: CoreApiVersion = CoreApiVersion::new(1, 24);

/// Configuration for an [`ArchiveValidator`](crate::ArchiveValidator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ValidatorConfig {
    /// Whitespace-separated extensions allowed in `content/`.
    pub content_whitelist: String,
    /// Whitespace-separated extensions allowed in library directories,
    /// on top of `content_whitelist`.
    pub library_whitelist: String,
    /// Maximum uncompressed size of any single entry, in bytes.
    pub max_file_size: u64,
    /// Maximum summed uncompressed size of all entries, in bytes.
    pub max_total_size: u64,
    /// Core API version libraries are checked against.
    pub core_api: CoreApiVersion,
    /// Required suffix of the uploaded file's name.
    pub package_extension: String,
    /// Abort at the first issue instead of collecting all of them.
    pub fail_fast: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            content_whitelist: DEFAULT_CONTENT_WHITELIST.to_string(),
            library_whitelist: DEFAULT_LIBRARY_WHITELIST.to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_total_size: DEFAULT_MAX_TOTAL_SIZE,
            core_api: DEFAULT_CORE_API,
            package_extension: ".h5p".to_string(),
            fail_fast: false,
        }
    }
}

impl ValidatorConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables (all optional, defaults in parentheses):
    /// - `H5P_CONTENT_WHITELIST` (see [`DEFAULT_CONTENT_WHITELIST`])
    /// - `H5P_LIBRARY_WHITELIST` (`js css`)
    /// - `H5P_MAX_FILE_SIZE` (16 MiB)
    /// - `H5P_MAX_TOTAL_SIZE` (64 MiB)
    /// - `H5P_CORE_API` (`1.24`)
    /// - `H5P_PACKAGE_EXTENSION` (`.h5p`)
    /// - `H5P_FAIL_FAST` (`false`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from a YAML or JSON file. Missing keys keep
    /// their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        // JSON is a subset of YAML, so one parser covers both.
        serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            content_whitelist: lookup("H5P_CONTENT_WHITELIST").unwrap_or(defaults.content_whitelist),
            library_whitelist: lookup("H5P_LIBRARY_WHITELIST").unwrap_or(defaults.library_whitelist),
            max_file_size: parse_var(&lookup, "H5P_MAX_FILE_SIZE", defaults.max_file_size)?,
            max_total_size: parse_var(&lookup, "H5P_MAX_TOTAL_SIZE", defaults.max_total_size)?,
            core_api: parse_var(&lookup, "H5P_CORE_API", defaults.core_api)?,
            package_extension: lookup("H5P_PACKAGE_EXTENSION")
                .unwrap_or(defaults.package_extension),
            fail_fast: parse_var(&lookup, "H5P_FAIL_FAST", defaults.fail_fast)?,
        })
    }

    /// Extensions allowed in `content/`, lowercased.
    pub fn content_extensions(&self) -> BTreeSet<String> {
        split_extensions(&self.content_whitelist)
    }

    /// Extensions allowed in library directories: the library whitelist
    /// plus the content whitelist.
    pub fn library_extensions(&self) -> BTreeSet<String> {
        let mut all = self.content_extensions();
        all.extend(split_extensions(&self.library_whitelist));
        all
    }
}

fn split_extensions(list: &str) -> BTreeSet<String> {
    list.split_whitespace()
        .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var: var.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: String,
        value: String,
        reason: String,
    },
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {reason}")]
    Parse { path: String, reason: String },
}
