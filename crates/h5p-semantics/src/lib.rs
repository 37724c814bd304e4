//! # h5p-semantics — Content Parameters Against Semantic Schemas
//!
//! A content type describes the shape of its parameters in
//! `semantics.json`. This crate parses those schemas and walks parameter
//! documents alongside them:
//!
//! - [`field`] — the typed schema model ([`SemanticField`], [`FieldKind`]).
//! - [`source`] — where schemas come from ([`SemanticsSource`],
//!   [`SemanticsCatalog`]).
//! - [`walker`] — the depth-first [`SemanticTreeWalker`] and its
//!   [`Visitor`] protocol, including nested library resolution.
//! - [`enforcer`] — [`SemanticsEnforcer`], which deletes invalid library
//!   references and sanitizes text in place.
//! - [`html`] — the per-field [`HtmlWhitelist`].
//! - [`files`] — [`scan_files`], listing the files content refers to.
//!
//! ```
//! use h5p_core::VersionedName;
//! use h5p_semantics::{SemanticsCatalog, SemanticsEnforcer};
//! use serde_json::json;
//!
//! let main = VersionedName::parse("H5P.Text-1.0").unwrap();
//! let catalog = SemanticsCatalog::new()
//!     .with_json(&main, &json!([{"name": "text", "type": "text", "tags": ["em"]}]))
//!     .unwrap();
//!
//! let mut params = json!({"text": "<em>hi</em><script>alert(1)</script>"});
//! SemanticsEnforcer::new(&catalog).enforce(&mut params, &main).unwrap();
//! assert_eq!(params, json!({"text": "<em>hi</em>"}));
//! ```

pub mod enforcer;
pub mod error;
pub mod field;
pub mod files;
pub mod html;
pub mod source;
pub mod walker;

pub use enforcer::{EnforcementReport, EnforcerOptions, SemanticsEnforcer};
pub use error::{SemanticsError, SemanticsResult};
pub use field::{
    parse_semantics, parse_semantics_str, FieldKind, FontOptions, SemanticField, TextField,
    TextPattern,
};
pub use files::{scan_files, FileReference};
pub use html::HtmlWhitelist;
pub use source::{SemanticsCatalog, SemanticsSource};
pub use walker::{SemanticTreeWalker, Visit, Visitor, ROOT_PATH};
