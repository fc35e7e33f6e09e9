//! # Binding Resolver
//!
//! Declarative references from element content to fields of a [`DataContext`].
//!
//! A [`BindingConfig`] is persisted verbatim in one of two JSON shapes:
//!
//! ```json
//! { "template": "Certified: {{profile.full_name}}" }
//! ```
//!
//! ```json
//! [
//!   { "source": "profile", "field": "full_name", "fallback": "Unknown", "transform": "uppercase" },
//!   { "source": "artist", "field": "city" }
//! ]
//! ```
//!
//! Resolution never fails; a miss yields an empty string or the fallback.

pub mod context;
pub mod resolve;

use serde::{Deserialize, Serialize};

pub use context::{ARTIST, DataContext, PROFILE, Record};
pub use resolve::{apply_transform, replace, resolve, resolve_entry};

/// Case transform applied after fallback substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    Uppercase,
    Lowercase,
    /// First letter of each word.
    Capitalize,
}

/// One `source.field` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingEntry {
    pub source: String,
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

impl BindingEntry {
    pub fn new(source: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            field: field.into(),
            fallback: None,
            transform: None,
        }
    }

    pub fn fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindingConfig {
    /// Literal text with `{{namespace.field}}` placeholders.
    Template { template: String },
    /// Entries resolved independently, joined by newline.
    Entries(Vec<BindingEntry>),
}

impl BindingConfig {
    pub fn template(template: impl Into<String>) -> Self {
        BindingConfig::Template {
            template: template.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            BindingConfig::Template { template } => template.trim().is_empty(),
            BindingConfig::Entries(entries) => entries.is_empty(),
        }
    }

    /// Resolve to display text.
    ///
    /// Entries that resolve empty (after fallback) are dropped before joining,
    /// so an absent optional line leaves no blank gap.
    pub fn resolve_text(&self, context: &DataContext) -> String {
        match self {
            BindingConfig::Template { template } => replace(template, Some(context)),
            BindingConfig::Entries(entries) => entries
                .iter()
                .map(|e| resolve_entry(Some(context), e))
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Resolve only the first entry. Image URLs bind through this.
    pub fn first_value(&self, context: &DataContext) -> String {
        match self {
            BindingConfig::Template { template } => replace(template, Some(context)),
            BindingConfig::Entries(entries) => entries
                .first()
                .map(|e| resolve_entry(Some(context), e))
                .unwrap_or_default(),
        }
    }

    /// Every `(source, field)` pair this binding reads.
    pub fn referenced_fields(&self) -> Vec<(String, String)> {
        match self {
            BindingConfig::Template { template } => resolve::placeholders(template),
            BindingConfig::Entries(entries) => entries
                .iter()
                .map(|e| (e.source.clone(), e.field.clone()))
                .collect(),
        }
    }
}
