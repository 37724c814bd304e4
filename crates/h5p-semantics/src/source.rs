//! Where semantic schemas come from.
//!
//! The walker resolves nested library references through a
//! [`SemanticsSource`]. A library the source does not know is treated as
//! having no schema: its subtree is left alone.

use std::borrow::Cow;
use std::collections::HashMap;

use h5p_core::VersionedName;
use serde_json::Value;

use crate::error::SemanticsResult;
use crate::field::{parse_semantics, SemanticField};

/// Lookup of a library's semantic schema.
pub trait SemanticsSource {
    /// The schema of `library`, or `None` if it is not installed or has no
    /// semantics. Patch versions are irrelevant to the lookup.
    fn semantics(&self, library: &VersionedName) -> SemanticsResult<Option<Cow<'_, [SemanticField]>>>;
}

impl<S: SemanticsSource + ?Sized> SemanticsSource for &S {
    fn semantics(&self, library: &VersionedName) -> SemanticsResult<Option<Cow<'_, [SemanticField]>>> {
        (**self).semantics(library)
    }
}

/// An in-memory semantics source keyed by ubername.
#[derive(Debug, Clone, Default)]
pub struct SemanticsCatalog {
    schemas: HashMap<String, Vec<SemanticField>>,
}

impl SemanticsCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the schema of `library`.
    pub fn insert(&mut self, library: &VersionedName, fields: Vec<SemanticField>) {
        self.schemas.insert(library.ubername(), fields);
    }

    /// Parse and add a `semantics.json` document.
    pub fn insert_json(&mut self, library: &VersionedName, document: &Value) -> SemanticsResult<()> {
        let fields = parse_semantics(document)?;
        self.insert(library, fields);
        Ok(())
    }

    /// Builder-style [`insert_json`](Self::insert_json).
    pub fn with_json(mut self, library: &VersionedName, document: &Value) -> SemanticsResult<Self> {
        self.insert_json(library, document)?;
        Ok(self)
    }

    /// The schema of `library`, if present.
    pub fn get(&self, library: &VersionedName) -> Option<&[SemanticField]> {
        self.schemas.get(&library.ubername()).map(Vec::as_slice)
    }

    /// Number of libraries with a schema.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl SemanticsSource for SemanticsCatalog {
    fn semantics(&self, library: &VersionedName) -> SemanticsResult<Option<Cow<'_, [SemanticField]>>> {
        Ok(self.get(library).map(Cow::Borrowed))
    }
}
