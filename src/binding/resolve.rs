//! Field resolution and placeholder substitution.
//!
//! Every function here is total: a missing context, namespace or field
//! produces an empty string, never an error.

use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;

use super::context::DataContext;
use super::{BindingEntry, Transform};

static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

/// Matches `{{source.field}}` and `{{source.nested.field}}` exactly, no inner spaces.
fn placeholder_regex() -> &'static Regex {
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{([A-Za-z0-9_]+)\.([A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)*)\}\}")
            .expect("placeholder pattern is valid")
    })
}

/// Stringify a leaf value. Objects, arrays and null have no textual form.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Resolve `source.field` against the context. `field` may be a dotted path.
pub fn resolve(context: Option<&DataContext>, source: &str, field: &str) -> String {
    let Some(ctx) = context else {
        return String::new();
    };
    if source.is_empty() || field.is_empty() {
        return String::new();
    }

    let mut segments = field.split('.');
    let Some(first) = segments.next() else {
        return String::new();
    };
    let Some(mut current) = ctx.top_level(source, first) else {
        return String::new();
    };
    for segment in segments {
        match current {
            Value::Object(map) => match map.get(segment) {
                Some(next) => current = next,
                None => return String::new(),
            },
            _ => return String::new(),
        }
    }

    scalar_to_string(current).unwrap_or_default()
}

/// Substitute every `{{source.field}}` token in `template`.
///
/// Unresolved tokens become empty strings; text that does not match the token
/// pattern exactly is left untouched.
pub fn replace(template: &str, context: Option<&DataContext>) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &Captures| {
            resolve(context, &caps[1], &caps[2])
        })
        .into_owned()
}

/// Every `(source, field)` pair referenced by a template string, in order.
pub fn placeholders(template: &str) -> Vec<(String, String)> {
    placeholder_regex()
        .captures_iter(template)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

pub fn apply_transform(value: &str, transform: Transform) -> String {
    match transform {
        Transform::Uppercase => value.to_uppercase(),
        Transform::Lowercase => value.to_lowercase(),
        Transform::Capitalize => capitalize_words(value),
    }
}

/// Uppercase the first letter of each whitespace-separated word; other
/// characters and the original spacing are kept.
fn capitalize_words(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for ch in value.chars() {
        if ch.is_whitespace() {
            at_word_start = true;
            out.push(ch);
        } else if at_word_start {
            at_word_start = false;
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Resolve one binding entry: field, then fallback when empty, then transform.
pub fn resolve_entry(context: Option<&DataContext>, entry: &BindingEntry) -> String {
    let mut value = resolve(context, &entry.source, &entry.field);
    if value.is_empty()
        && let Some(fallback) = &entry.fallback
    {
        value = fallback.clone();
    }
    match entry.transform {
        Some(t) => apply_transform(&value, t),
        None => value,
    }
}
