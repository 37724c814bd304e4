//! Content file references.
//!
//! Collects the files a content-parameters document points at, so callers
//! can copy, export, or garbage-collect them. `file` and `image` values
//! carry a single `path`; `video` and `audio` values are lists of sources,
//! each with a `path`. Remote URLs are not files of the content and are
//! skipped. Paths of files still in the editor's temporary area carry a
//! `#tmp` suffix, which is stripped.

use h5p_core::VersionedName;
use serde::Serialize;
use serde_json::Value;

use crate::error::SemanticsResult;
use crate::field::{FieldKind, SemanticField};
use crate::source::SemanticsSource;
use crate::walker::{SemanticTreeWalker, Visit};

const TEMPORARY_MARKER: &str = "#tmp";

/// One file referenced by content parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReference {
    /// Path relative to the content directory.
    pub file_path: String,
    /// Where the reference lives in the parameters.
    pub json_path: String,
    /// Declared MIME type, if any.
    pub mime: Option<String>,
}

/// Every file referenced by `params`, in document order.
///
/// `params` is not modified.
pub fn scan_files<S: SemanticsSource + ?Sized>(
    source: &S,
    params: &Value,
    main_library: &VersionedName,
) -> SemanticsResult<Vec<FileReference>> {
    let mut params = params.clone();
    let mut files = Vec::new();
    let mut visitor = |field: &SemanticField, value: &mut Value, path: &str| {
        match field.kind {
            FieldKind::File | FieldKind::Image => {
                collect(value, path.to_string(), &mut files);
                Visit::Prune
            }
            FieldKind::Video | FieldKind::Audio => {
                if let Some(sources) = value.as_array() {
                    for (index, source) in sources.iter().enumerate() {
                        collect(source, format!("{path}[{index}]"), &mut files);
                    }
                }
                Visit::Prune
            }
            _ => Visit::Continue,
        }
    };
    SemanticTreeWalker::new(source).walk(&mut params, main_library, &mut visitor)?;
    Ok(files)
}

fn collect(value: &Value, json_path: String, files: &mut Vec<FileReference>) {
    let Some(path) = value.get("path").and_then(Value::as_str) else {
        return;
    };
    if is_remote(path) {
        return;
    }
    let file_path = path.strip_suffix(TEMPORARY_MARKER).unwrap_or(path);
    if file_path.is_empty() {
        return;
    }
    files.push(FileReference {
        file_path: file_path.to_string(),
        json_path,
        mime: value.get("mime").and_then(Value::as_str).map(str::to_string),
    });
}

fn is_remote(path: &str) -> bool {
    let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
