//! # Library Sub-Chain
//!
//! Every top-level directory of a package other than `content/` is a
//! library. Each one is validated by its own [`RuleChain`] so a broken
//! library stops only its own checks; its issues still land in the
//! package-level accumulator.
//!
//! Order of checks:
//!
//! 1. directory name is a legal library directory name (fatal)
//! 2. `semantics.json`, when present, parses (accumulated)
//! 3. `library.json` exists and conforms to the metadata schema (fatal)
//! 4. required core API is not newer than the running one (accumulated)
//! 5. directory name matches `machineName` or `machineName-major.minor`
//! 6. every preloaded JS/CSS file exists
//! 7. every file under `language/` has a legal name and parses

use h5p_core::{CoreApiVersion, IssueCode, LibraryMetadata, ValidationErrors, ValidationIssue};
use h5p_schema::{PackageSchemas, SchemaKind};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::archive::{ArchiveEntry, PackageArchive};
use crate::chain::{RuleChain, StepOutcome};
use crate::error::PackageResult;
use crate::rules::{file_must_exist, read_json, schema_issues, ArchiveView, Severity};

static LIBRARY_DIRECTORY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-.]{1,255}$").expect("library directory regex"));

static LANGUAGE_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?[a-z]+){1,7}\.json$").expect("language file regex"));

/// A library directory before its metadata has been read.
pub(crate) struct LibraryCandidate<'a> {
    directory: String,
    archive: &'a mut dyn PackageArchive,
    entries: &'a [ArchiveEntry],
}

impl<'a> LibraryCandidate<'a> {
    pub(crate) fn new(
        directory: impl Into<String>,
        archive: &'a mut dyn PackageArchive,
        entries: &'a [ArchiveEntry],
    ) -> Self {
        Self {
            directory: directory.into(),
            archive,
            entries,
        }
    }

    fn path(&self, relative: &str) -> String {
        format!("{}/{}", self.directory, relative)
    }
}

impl ArchiveView for LibraryCandidate<'_> {
    fn entries(&self) -> &[ArchiveEntry] {
        self.entries
    }

    fn archive(&mut self) -> &mut dyn PackageArchive {
        &mut *self.archive
    }
}

/// A library directory with parsed, schema-valid metadata.
pub(crate) struct CheckedLibrary<'a> {
    candidate: LibraryCandidate<'a>,
    metadata: LibraryMetadata,
}

impl ArchiveView for CheckedLibrary<'_> {
    fn entries(&self) -> &[ArchiveEntry] {
        self.candidate.entries
    }

    fn archive(&mut self) -> &mut dyn PackageArchive {
        &mut *self.candidate.archive
    }
}

/// Build the sub-chain for one library directory.
pub(crate) fn library_chain<'r, 'a: 'r>(
    directory: &str,
    schemas: &'r PackageSchemas,
    core_api: CoreApiVersion,
) -> RuleChain<'r, LibraryCandidate<'a>, LibraryMetadata> {
    RuleChain::new()
        .add_rule(directory_name_must_be_valid)
        .add_rule(semantics_must_parse)
        .add_rule(file_must_exist(
            format!("{directory}/library.json"),
            IssueCode::LibraryMetadataMissing,
            Severity::Fatal,
        ))
        .add_rule(move |lib, _: &ValidationErrors| metadata_must_conform(lib, schemas))
        .add_rule(move |lib, _: &ValidationErrors| core_api_must_be_supported(lib, core_api))
        .add_rule(directory_must_match_metadata)
        .add_rule(preloaded_files_must_exist)
        .add_rule(language_files_must_be_valid)
        .add_rule(|lib: CheckedLibrary<'a>, _: &ValidationErrors| {
            Ok(StepOutcome::Continue(lib.metadata))
        })
}

fn directory_name_must_be_valid<'a>(
    lib: LibraryCandidate<'a>,
    _errors: &ValidationErrors,
) -> PackageResult<StepOutcome<LibraryCandidate<'a>>> {
    if LIBRARY_DIRECTORY.is_match(&lib.directory) {
        Ok(StepOutcome::Continue(lib))
    } else {
        Ok(StepOutcome::abort(ValidationIssue::new(
            IssueCode::InvalidLibraryName,
            format!("Invalid library directory name: \"{}\".", lib.directory),
        )))
    }
}

fn semantics_must_parse<'a>(
    mut lib: LibraryCandidate<'a>,
    _errors: &ValidationErrors,
) -> PackageResult<StepOutcome<LibraryCandidate<'a>>> {
    let path = lib.path("semantics.json");
    if !lib.contains(&path) {
        return Ok(StepOutcome::Continue(lib));
    }
    let issues = match read_json(lib.archive(), &path) {
        Ok(_) => Vec::new(),
        Err(message) => vec![ValidationIssue::new(IssueCode::SemanticsUnparsable, message)],
    };
    Ok(StepOutcome::accumulate(lib, issues))
}

fn metadata_must_conform<'a>(
    mut lib: LibraryCandidate<'a>,
    schemas: &PackageSchemas,
) -> PackageResult<StepOutcome<CheckedLibrary<'a>>> {
    let path = lib.path("library.json");
    let document = match read_json(lib.archive(), &path) {
        Ok(document) => document,
        Err(message) => {
            return Ok(StepOutcome::abort(ValidationIssue::new(
                IssueCode::LibraryMetadataInvalid,
                message,
            )))
        }
    };

    let issues = schema_issues(
        schemas,
        SchemaKind::Library,
        &document,
        &path,
        IssueCode::LibraryMetadataInvalid,
    )?;
    if !issues.is_empty() {
        return Ok(StepOutcome::Abort(issues));
    }

    match serde_json::from_value::<LibraryMetadata>(document) {
        Ok(metadata) => Ok(StepOutcome::Continue(CheckedLibrary {
            candidate: lib,
            metadata,
        })),
        Err(e) => Ok(StepOutcome::abort(ValidationIssue::new(
            IssueCode::LibraryMetadataInvalid,
            format!("{path} could not be read as library metadata: {e}"),
        ))),
    }
}

fn core_api_must_be_supported(
    lib: CheckedLibrary<'_>,
    running: CoreApiVersion,
) -> PackageResult<StepOutcome<CheckedLibrary<'_>>> {
    let issues = match lib.metadata.core_api {
        Some(required) if required > running => vec![ValidationIssue::new(
            IssueCode::IncompatibleCoreApi,
            format!(
                "The library \"{}\" requires core API {required}, but this server provides {running}.",
                lib.metadata.ubername()
            ),
        )],
        _ => Vec::new(),
    };
    Ok(StepOutcome::accumulate(lib, issues))
}

fn directory_must_match_metadata<'a>(
    lib: CheckedLibrary<'a>,
    _errors: &ValidationErrors,
) -> PackageResult<StepOutcome<CheckedLibrary<'a>>> {
    let directory = &lib.candidate.directory;
    let issues = if *directory == lib.metadata.machine_name || *directory == lib.metadata.ubername() {
        Vec::new()
    } else {
        vec![ValidationIssue::new(
            IssueCode::LibraryDirectoryMismatch,
            format!(
                "Library directory \"{directory}\" must be named \"{}\" or \"{}\".",
                lib.metadata.machine_name,
                lib.metadata.ubername()
            ),
        )]
    };
    Ok(StepOutcome::accumulate(lib, issues))
}

fn preloaded_files_must_exist<'a>(
    lib: CheckedLibrary<'a>,
    errors: &ValidationErrors,
) -> PackageResult<StepOutcome<CheckedLibrary<'a>>> {
    let paths: Vec<String> = lib
        .metadata
        .preloaded_files()
        .map(|file| lib.candidate.path(file.trim_start_matches(['/', '\\'])))
        .collect();

    let mut issues = Vec::new();
    let mut lib = lib;
    for path in paths {
        let mut check = file_must_exist(path, IssueCode::PreloadedFileMissing, Severity::Accumulate);
        match check(lib, errors)?.collect_into(&mut issues) {
            Some(next) => lib = next,
            None => return Ok(StepOutcome::Abort(issues)),
        }
    }
    Ok(StepOutcome::accumulate(lib, issues))
}

fn language_files_must_be_valid<'a>(
    mut lib: CheckedLibrary<'a>,
    _errors: &ValidationErrors,
) -> PackageResult<StepOutcome<CheckedLibrary<'a>>> {
    let prefix = lib.candidate.path("language/");
    let language_files: Vec<ArchiveEntry> = lib
        .entries()
        .iter()
        .filter(|entry| entry.path.starts_with(&prefix))
        .cloned()
        .collect();

    let mut issues = Vec::new();
    for entry in language_files {
        if !LANGUAGE_FILE.is_match(entry.base_name()) {
            issues.push(ValidationIssue::new(
                IssueCode::InvalidLanguageFileName,
                format!("Invalid language file name: \"{}\".", entry.path),
            ));
            continue;
        }
        if let Err(message) = read_json(lib.archive(), &entry.path) {
            issues.push(ValidationIssue::new(IssueCode::LanguageFileUnparsable, message));
        }
    }
    Ok(StepOutcome::accumulate(lib, issues))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ZipPackage;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const CORE_API: CoreApiVersion = CoreApiVersion::new(1, 24);

    fn package(files: &[(&str, &str)]) -> ZipPackage<Cursor<Vec<u8>>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in files {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data.as_bytes()).unwrap();
        }
        ZipPackage::new(Cursor::new(writer.finish().unwrap().into_inner())).unwrap()
    }

    fn library_json(machine_name: &str, extra: &str) -> String {
        format!(
            r#"{{"title": "Example", "machineName": "{machine_name}", "majorVersion": 1,
                "minorVersion": 2, "patchVersion": 3, "runnable": 1{extra}}}"#
        )
    }

    fn run(directory: &str, files: &[(&str, &str)]) -> (Option<LibraryMetadata>, ValidationErrors) {
        let schemas = PackageSchemas::builtin().unwrap();
        let mut archive = package(files);
        let entries = archive.entries().to_vec();
        let mut errors = ValidationErrors::new();
        let candidate = LibraryCandidate::new(directory, &mut archive, &entries);
        let out = library_chain(directory, &schemas, CORE_API)
            .validate_into(candidate, &mut errors)
            .unwrap();
        (out, errors)
    }

    #[test]
    fn valid_library_yields_metadata() {
        let meta = library_json(
            "H5P.Example",
            r#", "preloadedJs": [{"path": "example.js"}], "coreApi": {"major": 1, "minor": 19}"#,
        );
        let (out, errors) = run(
            "H5P.Example-1.2",
            &[
                ("H5P.Example-1.2/library.json", &meta),
                ("H5P.Example-1.2/example.js", "var x;"),
                ("H5P.Example-1.2/semantics.json", "[]"),
                ("H5P.Example-1.2/language/de.json", "{}"),
            ],
        );
        assert!(errors.is_empty(), "{errors}");
        assert_eq!(out.unwrap().ubername(), "H5P.Example-1.2");
    }

    #[test]
    fn bare_machine_name_directory_is_accepted() {
        let meta = library_json("H5P.Example", "");
        let (out, errors) = run("H5P.Example", &[("H5P.Example/library.json", &meta)]);
        assert!(errors.is_empty(), "{errors}");
        assert!(out.is_some());
    }

    #[test]
    fn invalid_directory_name_is_fatal() {
        let (out, errors) = run("bad name!", &[("bad name!/library.json", "{}")]);
        assert!(out.is_none());
        assert!(errors.has_code(IssueCode::InvalidLibraryName));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn missing_metadata_is_fatal() {
        let (out, errors) = run("H5P.Example", &[("H5P.Example/example.js", "")]);
        assert!(out.is_none());
        assert!(errors.has_code(IssueCode::LibraryMetadataMissing));
    }

    #[test]
    fn schema_violation_is_fatal() {
        let (out, errors) = run(
            "H5P.Example",
            &[("H5P.Example/library.json", r#"{"title": "No version"}"#)],
        );
        assert!(out.is_none());
        assert!(errors.has_code(IssueCode::LibraryMetadataInvalid));
        assert!(!errors.has_code(IssueCode::LibraryDirectoryMismatch));
    }

    #[test]
    fn malformed_semantics_is_not_fatal() {
        let meta = library_json("H5P.Example", "");
        let (out, errors) = run(
            "H5P.Example",
            &[
                ("H5P.Example/semantics.json", "[{"),
                ("H5P.Example/library.json", &meta),
            ],
        );
        assert!(out.is_some());
        assert_eq!(errors.len(), 1);
        assert!(errors.has_code(IssueCode::SemanticsUnparsable));
    }

    #[test]
    fn newer_core_api_and_wrong_directory_accumulate() {
        let meta = library_json("H5P.Example", r#", "coreApi": {"major": 1, "minor": 99}"#);
        let (out, errors) = run("H5P.Other", &[("H5P.Other/library.json", &meta)]);
        assert!(out.is_some());
        assert!(errors.has_code(IssueCode::IncompatibleCoreApi));
        assert!(errors.has_code(IssueCode::LibraryDirectoryMismatch));
    }

    #[test]
    fn each_missing_preloaded_file_is_reported() {
        let meta = library_json(
            "H5P.Example",
            r#", "preloadedJs": [{"path": "a.js"}, {"path": "b.js"}],
                "preloadedCss": [{"path": "styles/c.css"}]"#,
        );
        let (_, errors) = run(
            "H5P.Example",
            &[("H5P.Example/library.json", &meta), ("H5P.Example/a.js", "")],
        );
        assert_eq!(errors.count_code(IssueCode::PreloadedFileMissing), 2);
        assert!(errors.messages().iter().any(|m| m.contains("H5P.Example/styles/c.css")));
    }

    #[test]
    fn language_files_are_checked_per_file() {
        let meta = library_json("H5P.Example", "");
        let (_, errors) = run(
            "H5P.Example",
            &[
                ("H5P.Example/library.json", &meta),
                ("H5P.Example/language/nb.json", "{}"),
                ("H5P.Example/language/pt-br.json", "{}"),
                ("H5P.Example/language/EN.json", "{}"),
                ("H5P.Example/language/fr.json", "{not json"),
            ],
        );
        assert_eq!(errors.count_code(IssueCode::InvalidLanguageFileName), 1);
        assert_eq!(errors.count_code(IssueCode::LanguageFileUnparsable), 1);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn directory_pattern_is_ascii_only() {
        assert!(LIBRARY_DIRECTORY.is_match("H5P.Greeting-1.0"));
        assert!(LIBRARY_DIRECTORY.is_match("FontAwesome_4.5"));
        assert!(!LIBRARY_DIRECTORY.is_match("Bibliothèque.Ü"));
        assert!(!LIBRARY_DIRECTORY.is_match(""));

        let (out, errors) = run("Bibliothèque-1.0", &[("Bibliothèque-1.0/library.json", "{}")]);
        assert!(out.is_none());
        assert!(errors.has_code(IssueCode::InvalidLibraryName));
    }

    #[test]
    fn language_file_pattern() {
        assert!(LANGUAGE_FILE.is_match("en.json"));
        assert!(LANGUAGE_FILE.is_match("zh-hans-cn.json"));
        assert!(!LANGUAGE_FILE.is_match("EN.json"));
        assert!(!LANGUAGE_FILE.is_match("en.js"));
        assert!(!LANGUAGE_FILE.is_match("en_US.json"));
    }
}
