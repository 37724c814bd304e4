//! # Semantics Enforcer
//!
//! A [`Visitor`] that makes untrusted content parameters safe to store.
//! Malformed content is never an error; it is deleted:
//!
//! - a `library` slot with no `library` reference, or referencing a
//!   library outside the slot's `options`, is removed with its subtree;
//! - a `text` value that is not a string is removed.
//!
//! With text sanitization enabled (the default), every remaining text
//! value is run through its field's [`HtmlWhitelist`], truncated to
//! `maxLength`, and, for optional fields with a `regexp`, blanked when it
//! does not match.

use h5p_core::VersionedName;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use serde_json::Value;

use crate::error::SemanticsResult;
use crate::field::{FieldKind, SemanticField, TextField, TextPattern};
use crate::html::HtmlWhitelist;
use crate::source::SemanticsSource;
use crate::walker::{SemanticTreeWalker, Visit, Visitor};

/// Enforcement settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnforcerOptions {
    /// Sanitize text fields in addition to checking library references.
    pub sanitize_text: bool,
}

impl Default for EnforcerOptions {
    fn default() -> Self {
        Self {
            sanitize_text: true,
        }
    }
}

/// What an enforcement pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnforcementReport {
    /// JSON paths of removed nodes.
    pub removed: Vec<String>,
    /// JSON paths of text values that were rewritten.
    pub modified: Vec<String>,
}

impl EnforcementReport {
    /// Whether the parameters were left untouched.
    pub fn is_clean(&self) -> bool {
        self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Applies semantic constraints to content parameters in place.
#[derive(Debug)]
pub struct SemanticsEnforcer<'s, S: ?Sized> {
    walker: SemanticTreeWalker<'s, S>,
    options: EnforcerOptions,
}

impl<'s, S: SemanticsSource + ?Sized> SemanticsEnforcer<'s, S> {
    /// Enforcer with default options.
    pub fn new(source: &'s S) -> Self {
        Self::with_options(source, EnforcerOptions::default())
    }

    /// Enforcer with explicit options.
    pub fn with_options(source: &'s S, options: EnforcerOptions) -> Self {
        Self {
            walker: SemanticTreeWalker::new(source),
            options,
        }
    }

    /// Enforce the semantics of `main_library` on `params`.
    ///
    /// Errors only come from the semantics source.
    pub fn enforce(
        &self,
        params: &mut Value,
        main_library: &VersionedName,
    ) -> SemanticsResult<EnforcementReport> {
        let mut visitor = EnforcingVisitor {
            options: self.options,
            report: EnforcementReport::default(),
        };
        self.walker.walk(params, main_library, &mut visitor)?;
        tracing::debug!(
            library = %main_library,
            removed = visitor.report.removed.len(),
            modified = visitor.report.modified.len(),
            "semantics enforced"
        );
        Ok(visitor.report)
    }
}

struct EnforcingVisitor {
    options: EnforcerOptions,
    report: EnforcementReport,
}

impl EnforcingVisitor {
    fn remove(&mut self, path: &str, reason: &str) -> Visit {
        tracing::info!(path, reason, "removed invalid content");
        self.report.removed.push(path.to_string());
        Visit::Remove
    }
}

impl Visitor for EnforcingVisitor {
    fn visit(&mut self, field: &SemanticField, value: &mut Value, path: &str) -> Visit {
        match &field.kind {
            FieldKind::Library { options } => {
                let Some(library) = value.get("library") else {
                    return self.remove(path, "library reference missing");
                };
                let allowed = library
                    .as_str()
                    .is_some_and(|library| library_allowed(library, options));
                if allowed {
                    Visit::Continue
                } else {
                    self.remove(path, "library not allowed here")
                }
            }
            FieldKind::Text(text) => {
                let Some(current) = value.as_str() else {
                    return self.remove(path, "text value is not a string");
                };
                if !self.options.sanitize_text {
                    return Visit::Continue;
                }
                let cleaned = clean_text(current, text, field.optional, path);
                if cleaned != current {
                    self.report.modified.push(path.to_string());
                    *value = Value::String(cleaned);
                }
                Visit::Continue
            }
            _ => Visit::Continue,
        }
    }
}

/// `Name 1.2` and `Name-1.2` name the same library; anything unparsable
/// must match an option exactly.
fn library_allowed(library: &str, options: &[String]) -> bool {
    match VersionedName::parse(library) {
        Ok(name) => options.iter().any(|option| name.matches_str(option)),
        Err(_) => options.iter().any(|option| option == library),
    }
}

fn clean_text(value: &str, field: &TextField, optional: bool, path: &str) -> String {
    let mut cleaned = HtmlWhitelist::for_text(field).sanitize(value);

    if let Some(max) = field.max_length {
        if let Some((cut, _)) = cleaned.char_indices().nth(max) {
            cleaned.truncate(cut);
        }
    }

    if optional && !cleaned.is_empty() {
        if let Some(pattern) = &field.regexp {
            if let Some(regex) = compile(pattern, path) {
                if !regex.is_match(&cleaned) {
                    cleaned.clear();
                }
            }
        }
    }
    cleaned
}

fn compile(pattern: &TextPattern, path: &str) -> Option<Regex> {
    let result = RegexBuilder::new(&pattern.pattern)
        .case_insensitive(pattern.modifiers.contains('i'))
        .multi_line(pattern.modifiers.contains('m'))
        .build();
    match result {
        Ok(regex) => Some(regex),
        Err(err) => {
            tracing::warn!(path, pattern = %pattern.pattern, error = %err, "ignoring invalid regexp");
            None
        }
    }
}
