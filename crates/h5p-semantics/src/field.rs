//! # Semantic Field Model
//!
//! A content type's `semantics.json` is an array of field descriptors.
//! Each descriptor becomes a [`SemanticField`] whose [`FieldKind`] carries
//! exactly the attributes that matter for its `type`: a group owns its
//! `fields`, a list owns its item `field`, a library field owns its allowed
//! `options`, a text field owns its HTML and length constraints.
//!
//! Parsing is lenient about keys it does not use (labels, widgets,
//! defaults, importance) and strict about structure: a group without
//! fields, a list without an item field, or a required library slot with
//! no options is a schema error.

use serde_json::{Map, Value};

use crate::error::{SemanticsError, SemanticsResult};

/// One field of a semantic schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticField {
    /// Key of this field in the parent parameters object.
    pub name: String,
    /// Editor label.
    pub label: Option<String>,
    /// Editor description.
    pub description: Option<String>,
    /// Whether the field may be left empty.
    pub optional: bool,
    /// Whether the field is shared by every instance of the content type.
    pub common: bool,
    /// Type-specific attributes.
    pub kind: FieldKind,
}

/// Type-specific attributes of a [`SemanticField`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Free text, optionally HTML.
    Text(TextField),
    /// A number.
    Number,
    /// A boolean.
    Boolean,
    /// One value out of a fixed set.
    Select,
    /// A fixed set of named sub-fields.
    Group {
        /// The sub-fields.
        fields: Vec<SemanticField>,
    },
    /// A repeated field.
    List {
        /// Schema shared by every item.
        field: Box<SemanticField>,
    },
    /// Nested content rendered by another library.
    Library {
        /// Library strings (`Name 1.2`) the slot accepts.
        options: Vec<String>,
    },
    /// An uploaded file.
    File,
    /// An uploaded image.
    Image,
    /// One or more video sources.
    Video,
    /// One or more audio sources.
    Audio,
    /// A type this crate does not interpret.
    Other(String),
}

impl FieldKind {
    /// The `type` string this kind was parsed from.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Text(_) => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Select => "select",
            Self::Group { .. } => "group",
            Self::List { .. } => "list",
            Self::Library { .. } => "library",
            Self::File => "file",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Other(name) => name,
        }
    }
}

/// Constraints of a `text` field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextField {
    /// HTML tags the field allows (empty for plain text).
    pub tags: Vec<String>,
    /// Inline style permissions.
    pub font: FontOptions,
    /// Maximum length, in characters.
    pub max_length: Option<usize>,
    /// Pattern a non-empty value must match.
    pub regexp: Option<TextPattern>,
}

/// Which inline font styles a text field allows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FontOptions {
    /// `font-size`
    pub size: bool,
    /// `font-family`
    pub family: bool,
    /// `color`
    pub color: bool,
    /// `background-color`
    pub background: bool,
    /// `letter-spacing`
    pub spacing: bool,
    /// `line-height`
    pub height: bool,
}

/// A JavaScript-style pattern with its modifier flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPattern {
    /// The pattern source.
    pub pattern: String,
    /// Modifier letters, e.g. `i`.
    pub modifiers: String,
}

impl SemanticField {
    /// Parse one field descriptor. `path` locates it in error messages.
    pub fn from_value(value: &Value, path: &str) -> SemanticsResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| SemanticsError::invalid(path, "field is not an object"))?;
        let type_name = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| SemanticsError::invalid(path, "field has no type"))?;
        let optional = truthy(object.get("optional"));

        let kind = match type_name {
            "text" => FieldKind::Text(parse_text(object)),
            "number" => FieldKind::Number,
            "boolean" => FieldKind::Boolean,
            "select" => FieldKind::Select,
            "group" => {
                let fields = object
                    .get("fields")
                    .ok_or_else(|| SemanticsError::invalid(path, "group has no fields"))?;
                FieldKind::Group {
                    fields: parse_field_array(fields, &format!("{path}.fields"))?,
                }
            }
            "list" => {
                let field = object
                    .get("field")
                    .ok_or_else(|| SemanticsError::invalid(path, "list has no item field"))?;
                FieldKind::List {
                    field: Box::new(Self::from_value(field, &format!("{path}.field"))?),
                }
            }
            "library" => {
                let options = parse_library_options(object.get("options"));
                if options.is_empty() && !optional {
                    return Err(SemanticsError::invalid(
                        path,
                        "required library field has no options",
                    ));
                }
                FieldKind::Library { options }
            }
            "file" => FieldKind::File,
            "image" => FieldKind::Image,
            "video" => FieldKind::Video,
            "audio" => FieldKind::Audio,
            other => FieldKind::Other(other.to_string()),
        };

        Ok(Self {
            name: object
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            label: string_of(object.get("label")),
            description: string_of(object.get("description")),
            optional,
            common: truthy(object.get("common")),
            kind,
        })
    }

    /// A copy of this field answering to a different key.
    pub fn renamed(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..self.clone()
        }
    }
}

/// Parse a complete `semantics.json` document.
pub fn parse_semantics(document: &Value) -> SemanticsResult<Vec<SemanticField>> {
    parse_field_array(document, "$")
}

/// Parse `semantics.json` text.
pub fn parse_semantics_str(text: &str) -> SemanticsResult<Vec<SemanticField>> {
    parse_semantics(&serde_json::from_str(text)?)
}

fn parse_field_array(value: &Value, path: &str) -> SemanticsResult<Vec<SemanticField>> {
    value
        .as_array()
        .ok_or_else(|| SemanticsError::invalid(path, "expected an array of fields"))?
        .iter()
        .enumerate()
        .map(|(i, field)| SemanticField::from_value(field, &format!("{path}[{i}]")))
        .collect()
}

fn parse_text(object: &Map<String, Value>) -> TextField {
    let tags = object
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(str::to_ascii_lowercase)
                .collect()
        })
        .unwrap_or_default();

    let font = object.get("font").map_or_else(FontOptions::default, |font| FontOptions {
        size: truthy(font.get("size")),
        family: truthy(font.get("family")),
        color: truthy(font.get("color")),
        background: truthy(font.get("background")),
        spacing: truthy(font.get("spacing")),
        height: truthy(font.get("height")),
    });

    let regexp = object.get("regexp").and_then(|regexp| {
        Some(TextPattern {
            pattern: regexp.get("pattern")?.as_str()?.to_string(),
            modifiers: regexp
                .get("modifiers")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    });

    TextField {
        tags,
        font,
        max_length: object
            .get("maxLength")
            .and_then(Value::as_u64)
            .and_then(|n| usize::try_from(n).ok()),
        regexp,
    }
}

/// Options may be bare library strings or objects with a `name`.
fn parse_library_options(options: Option<&Value>) -> Vec<String> {
    options
        .and_then(Value::as_array)
        .map(|options| {
            options
                .iter()
                .filter_map(|option| match option {
                    Value::String(name) => Some(name.clone()),
                    Value::Object(map) => map.get("name").and_then(Value::as_str).map(str::to_string),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Flags may be booleans, `0`/`1`, or option lists (present means allowed).
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn string_of(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}
