//! Reusable rule steps shared by the package chain and the library sub-chain.

use h5p_core::{IssueCode, ValidationErrors, ValidationIssue};
use h5p_schema::{PackageSchemas, SchemaError, SchemaKind};
use serde_json::Value;

use crate::archive::{ArchiveEntry, PackageArchive};
use crate::chain::StepOutcome;
use crate::error::PackageResult;

/// Whether a failed check stops its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Record the issue and stop.
    Fatal,
    /// Record the issue and keep going.
    Accumulate,
}

impl Severity {
    pub(crate) fn outcome<A>(self, artifact: A, issues: Vec<ValidationIssue>) -> StepOutcome<A> {
        match self {
            Self::Fatal if !issues.is_empty() => StepOutcome::Abort(issues),
            _ => StepOutcome::accumulate(artifact, issues),
        }
    }
}

/// An artifact that exposes the (filtered) archive it was built from.
pub trait ArchiveView {
    /// Entries still under consideration.
    fn entries(&self) -> &[ArchiveEntry];

    /// The underlying archive, for reading entry data.
    fn archive(&mut self) -> &mut dyn PackageArchive;

    /// Whether an entry with exactly this path is present.
    fn contains(&self, path: &str) -> bool {
        self.entries().iter().any(|entry| entry.path == path)
    }
}

/// A step that checks `path` is present among the artifact's entries.
pub fn file_must_exist<A: ArchiveView>(
    path: impl Into<String>,
    code: IssueCode,
    severity: Severity,
) -> impl FnMut(A, &ValidationErrors) -> PackageResult<StepOutcome<A>> {
    let path = path.into();
    move |artifact: A, _errors: &ValidationErrors| {
        let issues = if artifact.contains(&path) {
            Vec::new()
        } else {
            vec![ValidationIssue::new(
                code,
                format!("The file \"{path}\" is missing from the package."),
            )]
        };
        Ok(severity.outcome(artifact, issues))
    }
}

/// Read and parse a JSON entry. The error is a user-facing message.
pub(crate) fn read_json(archive: &mut dyn PackageArchive, path: &str) -> Result<Value, String> {
    let bytes = archive
        .read_entry(path)
        .map_err(|e| format!("Unable to read \"{path}\": {e}"))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("Unable to parse JSON in \"{path}\": {e}"))
}

/// Validate `document` against a schema, turning violations into issues.
///
/// Schema failures other than violations are operational and propagate.
pub(crate) fn schema_issues(
    schemas: &PackageSchemas,
    kind: SchemaKind,
    document: &Value,
    path: &str,
    code: IssueCode,
) -> PackageResult<Vec<ValidationIssue>> {
    match schemas.validate(kind, document) {
        Ok(()) => Ok(Vec::new()),
        Err(SchemaError::ValidationFailed { violations, .. }) => Ok(violations
            .into_inner()
            .into_iter()
            .map(|v| ValidationIssue::new(code, format!("{path} does not conform to its schema: {v}")))
            .collect()),
        Err(other) => Err(other.into()),
    }
}
