//! # HTML Whitelist
//!
//! Derives the tag and inline-style whitelist of a `text` field from its
//! schema and sanitizes values with `ammonia`.
//!
//! Tags: `div`, `span`, `p` and `br` are always allowed, plus the field's
//! declared `tags`, plus companions implied by them (a table brings its
//! rows, cells, sections and caption; `strong`/`b` and `em`/`i` are
//! interchangeable; `del` or `strike` brings `s`; lists bring `li`). `script`,
//! `style`, `textarea` and `option` are never allowed, whatever the schema
//! says; the contents of `script` and `style` are dropped with them.
//!
//! Styles: `text-align` is always allowed. Each `font` flag unlocks one
//! property. Table layout properties are allowed only when `table` is.
//! A `style` attribute is rebuilt from its allowed declarations.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashSet};

use ammonia::Builder;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::field::TextField;

const BASE_TAGS: &[&str] = &["div", "span", "p", "br"];

const FORBIDDEN_TAGS: &[&str] = &["script", "style", "textarea", "option"];

const TABLE_TAGS: &[&str] = &["tr", "td", "th", "thead", "tbody", "tfoot", "caption"];

const TABLE_STYLES: &[&str] = &[
    "white-space",
    "vertical-align",
    "height",
    "width",
    "border-color",
    "background-color",
];

/// Pairs of tags where either member implies the other.
const ALIASES: &[(&str, &str)] = &[("strong", "b"), ("em", "i")];

/// `(tag, companion)`: declaring the tag also allows the companion.
const IMPLIED: &[(&str, &str)] = &[("del", "s"), ("strike", "s"), ("ul", "li"), ("ol", "li")];

static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z-]+)\s*:\s*(.+?)\s*$").expect("style declaration regex")
});

static SAFE_STYLE_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w\s#%.,'()+-]+$").expect("style value regex"));

static ACTIVE_STYLE_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(expression|url|javascript|behavior)\s*[(:]").expect("active style regex")
});

/// The sanitization rules of one `text` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlWhitelist {
    tags: BTreeSet<String>,
    styles: Vec<&'static str>,
}

impl HtmlWhitelist {
    /// Whitelist for a `text` field.
    pub fn for_text(field: &TextField) -> Self {
        let mut tags: BTreeSet<String> = BASE_TAGS.iter().map(|t| t.to_string()).collect();
        tags.extend(field.tags.iter().map(|t| t.to_ascii_lowercase()));

        if tags.contains("table") {
            tags.extend(TABLE_TAGS.iter().map(|t| t.to_string()));
        }
        for (a, b) in ALIASES {
            if tags.contains(*a) || tags.contains(*b) {
                tags.insert(a.to_string());
                tags.insert(b.to_string());
            }
        }
        for (tag, companion) in IMPLIED {
            if tags.contains(*tag) {
                tags.insert(companion.to_string());
            }
        }
        for forbidden in FORBIDDEN_TAGS {
            tags.remove(*forbidden);
        }

        let font = field.font;
        let mut styles = vec!["text-align"];
        for (enabled, property) in [
            (font.size, "font-size"),
            (font.family, "font-family"),
            (font.color, "color"),
            (font.background, "background-color"),
            (font.spacing, "letter-spacing"),
            (font.height, "line-height"),
        ] {
            if enabled {
                styles.push(property);
            }
        }
        if tags.contains("table") {
            for property in TABLE_STYLES {
                if !styles.contains(property) {
                    styles.push(property);
                }
            }
        }

        Self { tags, styles }
    }

    /// Whether `tag` survives sanitization.
    pub fn allows_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag.to_ascii_lowercase())
    }

    /// Whether inline `property` survives sanitization.
    pub fn allows_style(&self, property: &str) -> bool {
        self.styles.iter().any(|p| p.eq_ignore_ascii_case(property))
    }

    /// Allowed tags, sorted.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Remove everything the whitelist does not allow from `html`.
    pub fn sanitize(&self, html: &str) -> String {
        let tags: HashSet<&str> = self.tags.iter().map(String::as_str).collect();
        let styles = self.styles.clone();

        let mut builder = Builder::empty();
        builder
            .tags(tags)
            .clean_content_tags(HashSet::from(["script", "style"]))
            .add_tag_attributes("a", ["href", "target"])
            .add_tag_attributes("td", ["colspan", "rowspan"])
            .add_tag_attributes("th", ["colspan", "rowspan", "scope"])
            .add_generic_attributes(["style"])
            .url_schemes(HashSet::from(["http", "https", "mailto"]))
            .link_rel(None)
            .attribute_filter(move |_element, attribute, value| {
                if attribute == "style" {
                    filter_style(value, &styles).map(Cow::Owned)
                } else {
                    Some(Cow::Borrowed(value))
                }
            });
        builder.clean(html).to_string()
    }
}

/// Keep the allowed, inert declarations of a `style` attribute.
fn filter_style(style: &str, allowed: &[&str]) -> Option<String> {
    let kept: Vec<String> = style
        .split(';')
        .filter_map(|declaration| {
            let captures = DECLARATION.captures(declaration)?;
            let property = captures[1].to_ascii_lowercase();
            let value = &captures[2];
            let inert = SAFE_STYLE_VALUE.is_match(value) && !ACTIVE_STYLE_VALUE.is_match(value);
            (inert && allowed.contains(&property.as_str())).then(|| format!("{property}: {value}"))
        })
        .collect();
    (!kept.is_empty()).then(|| kept.join("; "))
}
