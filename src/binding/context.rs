//! Data context: the records a template is rendered for.
//!
//! Records are kept per namespace (`profile`, `artist`). By default the
//! context aliases the namespaces: a lookup through either known tag sees the
//! shallow merge of all records, later namespaces winning on collisions. This
//! is the behavior stored templates were authored against. [`DataContext::strict`]
//! scopes each tag to its own record.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Namespace tag of the generic user profile record.
pub const PROFILE: &str = "profile";
/// Namespace tag of the artist record.
pub const ARTIST: &str = "artist";

/// A JSON object record as returned by the record store.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Default)]
pub struct DataContext {
    /// Insertion order is merge order.
    namespaces: Vec<(String, Record)>,
    strict: bool,
}

impl DataContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard two-namespace context. `artist` is merged last.
    pub fn from_records(profile: Record, artist: Record) -> Self {
        Self::new()
            .with_namespace(PROFILE, profile)
            .with_namespace(ARTIST, artist)
    }

    /// Add (or replace) a namespace. Replacing keeps the original merge position.
    pub fn with_namespace(mut self, name: impl Into<String>, record: Record) -> Self {
        let name = name.into();
        match self.namespaces.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = record,
            None => self.namespaces.push((name, record)),
        }
        self
    }

    /// Disable namespace aliasing.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.iter().all(|(_, r)| r.is_empty())
    }

    pub fn namespace(&self, name: &str) -> Option<&Record> {
        self.namespaces
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }

    pub fn namespace_names(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter().map(|(n, _)| n.as_str())
    }

    /// Top-level key lookup under a namespace tag.
    ///
    /// Unknown tags resolve to nothing in both modes.
    pub fn top_level(&self, source: &str, key: &str) -> Option<&Value> {
        if self.strict {
            return self.namespace(source)?.get(key);
        }
        self.namespace(source)?;
        self.lookup_any(key)
    }

    /// Top-level key lookup across every namespace; the last merged wins.
    pub fn lookup_any(&self, key: &str) -> Option<&Value> {
        self.namespaces.iter().rev().find_map(|(_, r)| r.get(key))
    }

    /// Flattened `namespace.path → value` view of every scalar leaf, used by
    /// the editor's binding picker. Nested objects contribute dotted paths.
    pub fn flattened(&self) -> BTreeMap<String, Option<String>> {
        let mut out = BTreeMap::new();
        for (ns, record) in &self.namespaces {
            for (key, value) in record {
                flatten_into(&mut out, &format!("{}.{}", ns, key), value);
            }
        }
        out
    }
}

fn flatten_into(out: &mut BTreeMap<String, Option<String>>, path: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                flatten_into(out, &format!("{}.{}", path, k), v);
            }
        }
        other => {
            out.insert(path.to_string(), super::resolve::scalar_to_string(other));
        }
    }
}
