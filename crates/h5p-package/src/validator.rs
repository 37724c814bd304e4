//! # Archive Validator
//!
//! Validates an uploaded package before anything is installed. The checks
//! run as one [`RuleChain`] whose artifact evolves from the raw upload to
//! the opened archive to a [`ValidatedPackage`]:
//!
//! 1. file name ends in the package extension (fatal)
//! 2. archive opens as a zip (fatal)
//! 3. per-entry and total uncompressed sizes within limits
//! 4. hidden (`.x`), private (`_x`) and directory entries dropped
//! 5. `content/` entries use whitelisted extensions (content check)
//! 6. other entries use whitelisted extensions (library check)
//! 7. `h5p.json` exists and conforms to the manifest schema (content check, fatal)
//! 8. `content/content.json` exists and parses (fatal)
//! 9. barrier
//! 10. every `content/` file reads to the end
//! 11. every library directory passes the library sub-chain (library check)
//! 12. barrier
//! 13. success

use std::collections::BTreeSet;
use std::io::{self, BufReader, Read, Seek};
use std::path::Path;

use h5p_core::{IssueCode, LibraryMetadata, Manifest, ValidationErrors, ValidationIssue};
use h5p_schema::{PackageSchemas, SchemaKind};
use serde_json::Value;

use crate::archive::{ArchiveEntry, PackageArchive, ZipPackage};
use crate::chain::{RuleChain, StepOutcome};
use crate::config::ValidatorConfig;
use crate::error::{PackageError, PackageResult};
use crate::library::{library_chain, LibraryCandidate};
use crate::rules::{file_must_exist, read_json, schema_issues, ArchiveView, Severity};

/// Directory holding the content's own files.
pub const CONTENT_DIR: &str = "content";

/// Package manifest path.
pub const MANIFEST_FILE: &str = "h5p.json";

/// Content parameters path.
pub const CONTENT_FILE: &str = "content/content.json";

/// The outcome of a successful validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPackage {
    /// The manifest, when content was checked.
    pub manifest: Option<Manifest>,
    /// The content parameters document.
    pub content: Option<Value>,
    /// Metadata of every library in the package, when libraries were checked.
    pub libraries: Vec<LibraryMetadata>,
}

/// The upload before it has been opened.
struct Upload<R> {
    file_name: String,
    reader: R,
}

/// The opened archive and everything parsed from it so far.
struct PackageContents {
    archive: Box<dyn PackageArchive>,
    entries: Vec<ArchiveEntry>,
    manifest: Option<Manifest>,
    content: Option<Value>,
    libraries: Vec<LibraryMetadata>,
}

impl PackageContents {
    fn content_entries(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.entries.iter().filter(|entry| is_content_path(&entry.path))
    }

    /// Top-level directories other than `content/`, in archive order.
    fn library_directories(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.entries
            .iter()
            .filter_map(ArchiveEntry::top_level_dir)
            .filter(|dir| *dir != CONTENT_DIR && seen.insert(*dir))
            .map(str::to_string)
            .collect()
    }

    fn into_validated(self) -> ValidatedPackage {
        ValidatedPackage {
            manifest: self.manifest,
            content: self.content,
            libraries: self.libraries,
        }
    }
}

impl ArchiveView for PackageContents {
    fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    fn archive(&mut self) -> &mut dyn PackageArchive {
        &mut *self.archive
    }
}

fn is_content_path(path: &str) -> bool {
    path.strip_prefix(CONTENT_DIR)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Validates uploaded packages against a fixed configuration.
///
/// Build once, reuse for every upload: the schemas are compiled up front.
#[derive(Debug)]
pub struct ArchiveValidator {
    config: ValidatorConfig,
    schemas: PackageSchemas,
    content_extensions: BTreeSet<String>,
    library_extensions: BTreeSet<String>,
}

impl ArchiveValidator {
    /// Create a validator with the built-in schemas.
    pub fn new(config: ValidatorConfig) -> PackageResult<Self> {
        Ok(Self::with_schemas(config, PackageSchemas::builtin()?))
    }

    /// Create a validator with explicitly loaded schemas.
    pub fn with_schemas(config: ValidatorConfig, schemas: PackageSchemas) -> Self {
        Self {
            content_extensions: config.content_extensions(),
            library_extensions: config.library_extensions(),
            config,
            schemas,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a package file on disk.
    ///
    /// Failing to open the file is an operational error
    /// ([`PackageError::Open`]). Everything about its contents is reported
    /// as [`PackageError::Invalid`].
    pub fn validate(
        &self,
        path: &Path,
        check_content: bool,
        check_libraries: bool,
    ) -> PackageResult<ValidatedPackage> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !self.has_package_extension(&file_name) {
            // Step 1 aborts before the reader is touched.
            let nothing = io::Cursor::new(Vec::new());
            return self.validate_reader(&file_name, nothing, check_content, check_libraries);
        }
        let file = std::fs::File::open(path).map_err(|source| PackageError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        self.validate_reader(&file_name, BufReader::new(file), check_content, check_libraries)
    }

    /// Validate a package held by any seekable reader, e.g. an upload
    /// buffered in memory. `file_name` is the name the uploader gave it.
    pub fn validate_reader<R>(
        &self,
        file_name: &str,
        reader: R,
        check_content: bool,
        check_libraries: bool,
    ) -> PackageResult<ValidatedPackage>
    where
        R: Read + Seek + 'static,
    {
        tracing::debug!(file = %file_name, check_content, check_libraries, "validating package");
        let upload = Upload {
            file_name: file_name.to_string(),
            reader,
        };

        let validated = RuleChain::new()
            .add_rule(|upload, _| self.file_name_must_have_extension(upload))
            .add_rule(|upload, _| open_archive(upload))
            .add_rule(|pkg, _| self.sizes_must_be_within_limits(pkg))
            .add_rule(|pkg, _| Ok(StepOutcome::Continue(drop_ignored_entries(pkg))))
            .add_rule_when(|pkg, _| self.content_extensions_must_be_allowed(pkg), check_content)
            .add_rule_when(|pkg, _| self.library_extensions_must_be_allowed(pkg), check_libraries)
            .add_rule_when(
                file_must_exist(MANIFEST_FILE, IssueCode::ManifestMissing, Severity::Fatal),
                check_content,
            )
            .add_rule_when(|pkg, _| self.manifest_must_conform(pkg), check_content)
            .add_rule(file_must_exist(CONTENT_FILE, IssueCode::ContentMissing, Severity::Fatal))
            .add_rule(|pkg, _| content_must_parse(pkg))
            .throw_errors_now()
            .add_rule(|pkg, _| content_files_must_be_readable(pkg))
            .add_rule_when(
                |pkg, errors| self.libraries_must_be_valid(pkg, errors),
                check_libraries,
            )
            .throw_errors_now()
            .add_rule(|pkg: PackageContents, _| Ok(StepOutcome::Continue(pkg.into_validated())))
            .validate_with(upload, self.new_accumulator())?;

        tracing::info!(
            file = %file_name,
            libraries = validated.libraries.len(),
            "package validated"
        );
        Ok(validated)
    }

    fn new_accumulator(&self) -> ValidationErrors {
        if self.config.fail_fast {
            ValidationErrors::fail_fast()
        } else {
            ValidationErrors::new()
        }
    }

    fn has_package_extension(&self, file_name: &str) -> bool {
        let required = self.config.package_extension.to_ascii_lowercase();
        file_name.to_ascii_lowercase().ends_with(&required)
    }

    fn file_name_must_have_extension<R>(
        &self,
        upload: Upload<R>,
    ) -> PackageResult<StepOutcome<Upload<R>>> {
        if self.has_package_extension(&upload.file_name) {
            Ok(StepOutcome::Continue(upload))
        } else {
            Ok(StepOutcome::abort(ValidationIssue::new(
                IssueCode::MissingPackageExtension,
                format!(
                    "The file \"{}\" does not have the required extension {}.",
                    upload.file_name, self.config.package_extension
                ),
            )))
        }
    }

    fn sizes_must_be_within_limits(
        &self,
        pkg: PackageContents,
    ) -> PackageResult<StepOutcome<PackageContents>> {
        let mut issues = Vec::new();
        let mut total: u64 = 0;
        for entry in &pkg.entries {
            if entry.uncompressed_size > self.config.max_file_size {
                issues.push(ValidationIssue::new(
                    IssueCode::FileTooLarge,
                    format!(
                        "The file \"{}\" is {} bytes, which exceeds the limit of {} bytes.",
                        entry.path, entry.uncompressed_size, self.config.max_file_size
                    ),
                ));
            }
            total = total.saturating_add(entry.uncompressed_size);
        }
        if total > self.config.max_total_size {
            issues.push(ValidationIssue::new(
                IssueCode::TotalSizeTooLarge,
                format!(
                    "The package is {total} bytes uncompressed, which exceeds the limit of {} bytes.",
                    self.config.max_total_size
                ),
            ));
        }
        Ok(StepOutcome::accumulate(pkg, issues))
    }

    fn content_extensions_must_be_allowed(
        &self,
        pkg: PackageContents,
    ) -> PackageResult<StepOutcome<PackageContents>> {
        let issues = disallowed_extensions(
            pkg.content_entries(),
            &self.content_extensions,
            "content folder",
        );
        Ok(StepOutcome::accumulate(pkg, issues))
    }

    fn library_extensions_must_be_allowed(
        &self,
        pkg: PackageContents,
    ) -> PackageResult<StepOutcome<PackageContents>> {
        let issues = disallowed_extensions(
            pkg.entries.iter().filter(|entry| !is_content_path(&entry.path)),
            &self.library_extensions,
            "package",
        );
        Ok(StepOutcome::accumulate(pkg, issues))
    }

    fn manifest_must_conform(
        &self,
        mut pkg: PackageContents,
    ) -> PackageResult<StepOutcome<PackageContents>> {
        let fatal = |message: String| {
            Ok(StepOutcome::abort(ValidationIssue::new(IssueCode::ManifestInvalid, message)))
        };
        let document = match read_json(pkg.archive(), MANIFEST_FILE) {
            Ok(document) => document,
            Err(message) => return fatal(message),
        };
        let issues = schema_issues(
            &self.schemas,
            SchemaKind::Manifest,
            &document,
            MANIFEST_FILE,
            IssueCode::ManifestInvalid,
        )?;
        if !issues.is_empty() {
            return Ok(StepOutcome::Abort(issues));
        }
        match serde_json::from_value::<Manifest>(document) {
            Ok(manifest) => {
                pkg.manifest = Some(manifest);
                Ok(StepOutcome::Continue(pkg))
            }
            Err(e) => fatal(format!("{MANIFEST_FILE} could not be read as a manifest: {e}")),
        }
    }

    fn libraries_must_be_valid(
        &self,
        mut pkg: PackageContents,
        errors: &ValidationErrors,
    ) -> PackageResult<StepOutcome<PackageContents>> {
        let mut issues = Vec::new();
        let mut libraries = Vec::new();
        for directory in pkg.library_directories() {
            let mut library_errors = errors.sibling();
            let candidate = LibraryCandidate::new(&directory, &mut *pkg.archive, &pkg.entries);
            let chain = library_chain(&directory, &self.schemas, self.config.core_api);
            match chain.validate_into(candidate, &mut library_errors)? {
                Some(metadata) => libraries.push(metadata),
                None => tracing::debug!(library = %directory, "library rejected"),
            }
            if !library_errors.is_empty() {
                tracing::debug!(
                    library = %directory,
                    issues = library_errors.len(),
                    "library has issues"
                );
            }
            issues.extend(library_errors.into_issues());
            if errors.is_fail_fast() && !issues.is_empty() {
                break;
            }
        }
        pkg.libraries = libraries;
        Ok(StepOutcome::accumulate(pkg, issues))
    }
}

fn open_archive<R>(upload: Upload<R>) -> PackageResult<StepOutcome<PackageContents>>
where
    R: Read + Seek + 'static,
{
    match ZipPackage::new(upload.reader) {
        Ok(archive) => {
            let entries = archive.entries().to_vec();
            tracing::debug!(file = %upload.file_name, entries = entries.len(), "archive opened");
            Ok(StepOutcome::Continue(PackageContents {
                archive: Box::new(archive),
                entries,
                manifest: None,
                content: None,
                libraries: Vec::new(),
            }))
        }
        Err(e) => Ok(StepOutcome::abort(ValidationIssue::new(
            IssueCode::UnableToUnzip,
            format!("The file \"{}\" could not be unzipped: {e}", upload.file_name),
        ))),
    }
}

fn drop_ignored_entries(mut pkg: PackageContents) -> PackageContents {
    pkg.entries.retain(|entry| !entry.is_ignored());
    pkg
}

fn disallowed_extensions<'e>(
    entries: impl Iterator<Item = &'e ArchiveEntry>,
    allowed: &BTreeSet<String>,
    location: &str,
) -> Vec<ValidationIssue> {
    entries
        .filter(|entry| {
            entry
                .extension()
                .map_or(true, |ext| !allowed.contains(&ext))
        })
        .map(|entry| {
            ValidationIssue::new(
                IssueCode::ExtensionNotAllowed,
                format!(
                    "The file \"{}\" has an extension that is not allowed in the {location}.",
                    entry.path
                ),
            )
        })
        .collect()
}

fn content_must_parse(mut pkg: PackageContents) -> PackageResult<StepOutcome<PackageContents>> {
    match read_json(pkg.archive(), CONTENT_FILE) {
        Ok(content) => {
            pkg.content = Some(content);
            Ok(StepOutcome::Continue(pkg))
        }
        Err(message) => Ok(StepOutcome::abort(ValidationIssue::new(
            IssueCode::ContentUnparsable,
            message,
        ))),
    }
}

fn content_files_must_be_readable(
    mut pkg: PackageContents,
) -> PackageResult<StepOutcome<PackageContents>> {
    let paths: Vec<String> = pkg.content_entries().map(|entry| entry.path.clone()).collect();
    let mut issues = Vec::new();
    for path in paths {
        let drained = pkg
            .archive
            .open_entry(&path)
            .and_then(|mut reader| io::copy(&mut reader, &mut io::sink()));
        if let Err(e) = drained {
            issues.push(ValidationIssue::new(
                IssueCode::FileUnreadable,
                format!("The file \"{path}\" could not be read: {e}"),
            ));
        }
    }
    Ok(StepOutcome::accumulate(pkg, issues))
}
