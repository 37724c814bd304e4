//! Error types for the semantics crate.
//!
//! Malformed *content* never produces an error: the enforcer deletes it.
//! These errors cover malformed *schemas* and failing semantics sources.

use h5p_core::NameError;
use thiserror::Error;

/// Errors raised while parsing semantics or resolving libraries.
#[derive(Debug, Error)]
pub enum SemanticsError {
    /// A semantics document does not describe a valid field tree.
    #[error("invalid semantics at {path}: {reason}")]
    InvalidSchema { path: String, reason: String },

    /// The semantics source failed to produce a library's schema.
    #[error("failed to load semantics for {library}: {reason}")]
    Source { library: String, reason: String },

    /// A library name could not be parsed.
    #[error(transparent)]
    Name(#[from] NameError),

    /// A semantics document is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SemanticsError {
    pub(crate) fn invalid(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSchema {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for semantics operations.
pub type SemanticsResult<T> = Result<T, SemanticsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_schema_display_carries_path() {
        let err = SemanticsError::invalid("[0].fields[1]", "group without fields");
        let msg = format!("{err}");
        assert!(msg.contains("[0].fields[1]"));
        assert!(msg.contains("group without fields"));
    }

    #[test]
    fn name_error_is_transparent() {
        let err = SemanticsError::from(NameError::InvalidUbername("H5P Example".into()));
        assert_eq!(
            format!("{err}"),
            format!("{}", NameError::InvalidUbername("H5P Example".into()))
        );
    }
}
