//! # Validation Error Accumulator
//!
//! Package validation distinguishes fatal problems (the archive cannot be
//! opened, a required file is missing) from recoverable ones (one file has a
//! disallowed extension). Recoverable problems are collected here so that
//! the uploader sees every issue in one pass.
//!
//! Each [`ValidationIssue`] carries a stable [`IssueCode`] for programmatic
//! handling and a message intended for direct display.

use std::fmt;

use serde::Serialize;

/// Stable identifiers for every kind of package validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueCode {
    /// File name does not end in the package extension.
    MissingPackageExtension,
    /// The archive could not be opened as a zip file.
    UnableToUnzip,
    /// A single entry exceeds the per-file size limit.
    FileTooLarge,
    /// The summed uncompressed size exceeds the archive limit.
    TotalSizeTooLarge,
    /// An entry's extension is not in the active whitelist.
    ExtensionNotAllowed,
    /// The package manifest (`h5p.json`) is missing.
    ManifestMissing,
    /// The package manifest is not JSON or violates its schema.
    ManifestInvalid,
    /// The content parameters file is missing.
    ContentMissing,
    /// The content parameters file is not valid JSON.
    ContentUnparsable,
    /// An entry could not be read to the end.
    FileUnreadable,
    /// A library directory name contains disallowed characters.
    InvalidLibraryName,
    /// A library's `semantics.json` is not valid JSON.
    SemanticsUnparsable,
    /// A library directory has no `library.json`.
    LibraryMetadataMissing,
    /// A library's `library.json` is not JSON or violates its schema.
    LibraryMetadataInvalid,
    /// A library requires a newer core API than the one running.
    IncompatibleCoreApi,
    /// A library directory name does not match its metadata.
    LibraryDirectoryMismatch,
    /// A preloaded JavaScript or CSS file listed in metadata is missing.
    PreloadedFileMissing,
    /// A language file name does not follow the language code pattern.
    InvalidLanguageFileName,
    /// A language file is not valid JSON.
    LanguageFileUnparsable,
}

impl IssueCode {
    /// Kebab-case identifier, e.g. `file-size-too-large`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingPackageExtension => "missing-h5p-extension",
            Self::UnableToUnzip => "unable-to-unzip",
            Self::FileTooLarge => "file-size-too-large",
            Self::TotalSizeTooLarge => "total-size-too-large",
            Self::ExtensionNotAllowed => "not-in-whitelist",
            Self::ManifestMissing => "invalid-h5p-json-file",
            Self::ManifestInvalid => "invalid-h5p-json-file-2",
            Self::ContentMissing => "invalid-content-folder",
            Self::ContentUnparsable => "content-json-not-parsable",
            Self::FileUnreadable => "file-not-readable",
            Self::InvalidLibraryName => "invalid-library-name",
            Self::SemanticsUnparsable => "invalid-semantics-json-file",
            Self::LibraryMetadataMissing => "library-json-missing",
            Self::LibraryMetadataInvalid => "invalid-schema-library-json-file",
            Self::IncompatibleCoreApi => "api-version-unsupported",
            Self::LibraryDirectoryMismatch => "library-directory-name-mismatch",
            Self::PreloadedFileMissing => "library-missing-file",
            Self::InvalidLanguageFileName => "invalid-language-file",
            Self::LanguageFileUnparsable => "invalid-language-file-json",
        }
    }
}

impl Serialize for IssueCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Stable identifier.
    pub code: IssueCode,
    /// Human-readable description, ready for display.
    pub message: String,
}

impl ValidationIssue {
    /// Create an issue.
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// How the accumulator reacts to recoverable issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Collect issues and keep validating.
    #[default]
    Accumulate,
    /// Treat the first recorded issue as fatal.
    FailFast,
}

/// Mutable bag of validation failures for a single validation run.
///
/// Not shared across runs; a run owns its accumulator for its whole call
/// tree.
#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    issues: Vec<ValidationIssue>,
    mode: ErrorMode,
}

impl ValidationErrors {
    /// Empty accumulator in [`ErrorMode::Accumulate`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty accumulator in [`ErrorMode::FailFast`].
    pub fn fail_fast() -> Self {
        Self {
            issues: Vec::new(),
            mode: ErrorMode::FailFast,
        }
    }

    /// Empty accumulator with the same mode as `self`.
    pub fn sibling(&self) -> Self {
        Self {
            issues: Vec::new(),
            mode: self.mode,
        }
    }

    /// The configured mode.
    pub fn mode(&self) -> ErrorMode {
        self.mode
    }

    /// Whether a newly recorded issue must abort the current chain.
    pub fn is_fail_fast(&self) -> bool {
        self.mode == ErrorMode::FailFast
    }

    /// Record one issue.
    pub fn add_error(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Record one issue from its parts.
    pub fn add(&mut self, code: IssueCode, message: impl Into<String>) {
        self.add_error(ValidationIssue::new(code, message));
    }

    /// Record many issues, preserving their order.
    pub fn extend(&mut self, issues: impl IntoIterator<Item = ValidationIssue>) {
        self.issues.extend(issues);
    }

    /// Move every issue of `other` into `self`.
    pub fn absorb(&mut self, other: ValidationErrors) {
        self.issues.extend(other.issues);
    }

    /// No issues recorded.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of issues recorded.
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// All issues in recording order.
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Display messages in recording order.
    pub fn messages(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.message.as_str()).collect()
    }

    /// Whether any issue carries `code`.
    pub fn has_code(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }

    /// Number of issues carrying `code`.
    pub fn count_code(&self, code: IssueCode) -> usize {
        self.issues.iter().filter(|i| i.code == code).count()
    }

    /// Consume the accumulator and return its issues.
    pub fn into_issues(self) -> Vec<ValidationIssue> {
        self.issues
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl FromIterator<ValidationIssue> for ValidationErrors {
    fn from_iter<T: IntoIterator<Item = ValidationIssue>>(iter: T) -> Self {
        Self {
            issues: iter.into_iter().collect(),
            mode: ErrorMode::Accumulate,
        }
    }
}
