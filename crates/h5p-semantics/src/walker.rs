//! # Semantic Tree Walker
//!
//! Traverses a content-parameters document in lock-step with the semantic
//! schema of its main library, depth-first and pre-order. Each schema
//! field whose key is present in the parameters is handed to a
//! [`Visitor`] together with its value and a JSON path; the visitor
//! decides whether to descend, prune, or remove the node.
//!
//! ## Paths
//!
//! Paths start at `$`. A field appends `.name`; a list item appends `[i]`
//! instead of the item field's name; a library slot's nested parameters
//! append `.params`.
//!
//! ## Collapsed groups
//!
//! Editors store a group with a single field as the bare value of that
//! field (`{"G": "hello"}` rather than `{"G": {"T": "hello"}}`). When a
//! one-field group's value lacks the field's key, the group is visited
//! first and the lone field is then visited as its only child: same value,
//! same path, named after the group.
//!
//! ## Removal
//!
//! [`Visit::Remove`] deletes the node from its parent object, or from its
//! parent list after the list has been traversed, so list items never
//! shift under the walker.

use h5p_core::VersionedName;
use serde_json::Value;

use crate::error::SemanticsResult;
use crate::field::{FieldKind, SemanticField};
use crate::source::SemanticsSource;

/// Root of every JSON path produced by the walker.
pub const ROOT_PATH: &str = "$";

/// A visitor's decision about the node it was shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Descend into the node's children.
    Continue,
    /// Keep the node but skip its children.
    Prune,
    /// Delete the node from its parent; its children are not visited.
    Remove,
}

/// Receives every present schema node during a walk.
pub trait Visitor {
    /// Inspect (and possibly rewrite) `value`, which is described by
    /// `field` and located at `path`.
    fn visit(&mut self, field: &SemanticField, value: &mut Value, path: &str) -> Visit;
}

impl<F> Visitor for F
where
    F: FnMut(&SemanticField, &mut Value, &str) -> Visit,
{
    fn visit(&mut self, field: &SemanticField, value: &mut Value, path: &str) -> Visit {
        self(field, value, path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fate {
    Keep,
    Remove,
}

/// Walks parameters against schemas resolved from a [`SemanticsSource`].
#[derive(Debug)]
pub struct SemanticTreeWalker<'s, S: ?Sized> {
    source: &'s S,
}

impl<'s, S: SemanticsSource + ?Sized> SemanticTreeWalker<'s, S> {
    /// A walker resolving schemas through `source`.
    pub fn new(source: &'s S) -> Self {
        Self { source }
    }

    /// Walk `params` as content of `main_library`.
    ///
    /// A main library without semantics is not an error: nothing is
    /// visited. Errors come only from the source.
    pub fn walk(
        &self,
        params: &mut Value,
        main_library: &VersionedName,
        visitor: &mut dyn Visitor,
    ) -> SemanticsResult<()> {
        match self.source.semantics(main_library)? {
            Some(fields) => self.walk_fields(&fields, params, ROOT_PATH, visitor),
            None => {
                tracing::debug!(library = %main_library, "no semantics for main library");
                Ok(())
            }
        }
    }

    /// Walk `params` against an explicit field list.
    pub fn walk_fields(
        &self,
        fields: &[SemanticField],
        params: &mut Value,
        path: &str,
        visitor: &mut dyn Visitor,
    ) -> SemanticsResult<()> {
        let Some(object) = params.as_object_mut() else {
            return Ok(());
        };
        for field in fields {
            let Some(value) = object.get_mut(&field.name) else {
                continue;
            };
            let child_path = format!("{path}.{}", field.name);
            if self.walk_node(field, value, &child_path, visitor)? == Fate::Remove {
                object.remove(&field.name);
            }
        }
        Ok(())
    }

    fn walk_node(
        &self,
        field: &SemanticField,
        value: &mut Value,
        path: &str,
        visitor: &mut dyn Visitor,
    ) -> SemanticsResult<Fate> {
        match visitor.visit(field, value, path) {
            Visit::Continue => {}
            Visit::Prune => return Ok(Fate::Keep),
            Visit::Remove => return Ok(Fate::Remove),
        }

        match &field.kind {
            FieldKind::Group { fields } => match fields.as_slice() {
                [lone] if value.get(&lone.name).is_none() => {
                    return self.walk_node(&lone.renamed(&field.name), value, path, visitor);
                }
                _ => self.walk_fields(fields, value, path, visitor)?,
            },
            FieldKind::List { field: item } => self.walk_list(item, value, path, visitor)?,
            FieldKind::Library { .. } => self.walk_library(value, path, visitor)?,
            _ => {}
        }
        Ok(Fate::Keep)
    }

    fn walk_list(
        &self,
        item: &SemanticField,
        value: &mut Value,
        path: &str,
        visitor: &mut dyn Visitor,
    ) -> SemanticsResult<()> {
        let Some(items) = value.as_array_mut() else {
            return Ok(());
        };
        let mut removed = Vec::new();
        for (index, item_value) in items.iter_mut().enumerate() {
            let item_path = format!("{path}[{index}]");
            if self.walk_node(item, item_value, &item_path, visitor)? == Fate::Remove {
                removed.push(index);
            }
        }
        for index in removed.into_iter().rev() {
            items.remove(index);
        }
        Ok(())
    }

    fn walk_library(
        &self,
        value: &mut Value,
        path: &str,
        visitor: &mut dyn Visitor,
    ) -> SemanticsResult<()> {
        let Some(library) = value.get("library").and_then(Value::as_str) else {
            return Ok(());
        };
        let name = match VersionedName::parse(library) {
            Ok(name) => name,
            Err(err) => {
                tracing::debug!(path, error = %err, "unparsable library reference");
                return Ok(());
            }
        };
        let Some(fields) = self.source.semantics(&name)? else {
            tracing::debug!(path, library = %name, "no semantics for nested library");
            return Ok(());
        };
        if let Some(params) = value.get_mut("params") {
            self.walk_fields(&fields, params, &format!("{path}.params"), visitor)?;
        }
        Ok(())
    }
}
