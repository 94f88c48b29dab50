//! JSON file source.

use std::collections::BTreeMap;

use anyhow::Context as _;
use serde_json::{Map, Value};

use crate::key::normalize_key;

/// Source backed by a JSON object, flattened the same way as
/// [`Yaml`](super::Yaml): nested objects contribute namespace segments, scalar
/// leaves are stringified, nulls are skipped and arrays are rejected.
#[derive(Debug, Clone, Default)]
pub struct Json {
    filename: String,
    entries: BTreeMap<String, String>,
}

impl Json {
    /// Flattens the provided object. `filename` is only used in error and log
    /// messages.
    ///
    /// # Errors
    ///
    /// Returns an error on array leaves.
    pub fn new(filename: &str, object: Map<String, Value>) -> anyhow::Result<Self> {
        let mut entries = BTreeMap::new();
        flatten(&mut entries, &mut Vec::new(), object)
            .with_context(|| format!("error reading JSON config {filename:?}"))?;
        tracing::debug!(filename, entries = entries.len(), "loaded JSON config");
        Ok(Self {
            filename: filename.to_owned(),
            entries,
        })
    }

    /// Parses JSON text and flattens the top-level object.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid JSON, a non-object top level, or the
    /// conditions of [`Self::new`].
    pub fn from_str(filename: &str, text: &str) -> anyhow::Result<Self> {
        let value: Value = serde_json::from_str(text)
            .with_context(|| format!("error parsing JSON config {filename:?}"))?;
        let Value::Object(object) = value else {
            anyhow::bail!("JSON config {filename:?} must have an object at the top level");
        };
        Self::new(filename, object)
    }
}

fn flatten(
    entries: &mut BTreeMap<String, String>,
    path: &mut Vec<String>,
    object: Map<String, Value>,
) -> anyhow::Result<()> {
    for (key, value) in object {
        match value {
            Value::Object(nested) => {
                path.push(key);
                flatten(entries, path, nested)?;
                path.pop();
            }
            Value::Null => { /* no value; the key is absent */ }
            Value::Bool(value) => insert_leaf(entries, path, &key, value.to_string()),
            Value::Number(value) => insert_leaf(entries, path, &key, value.to_string()),
            Value::String(value) => insert_leaf(entries, path, &key, value),
            Value::Array(_) => {
                path.push(key);
                anyhow::bail!("unsupported value at {}; only scalars and objects are allowed", path.join("."));
            }
        }
    }
    Ok(())
}

fn insert_leaf(
    entries: &mut BTreeMap<String, String>,
    path: &[String],
    key: &str,
    value: String,
) {
    entries.insert(normalize_key(key, path), value);
}

impl super::Source for Json {
    fn get(&self, key: &str, namespace: &[String]) -> Option<String> {
        let full_key = normalize_key(key, namespace);
        tracing::trace!(%full_key, filename = %self.filename, "searching JSON source");
        self.entries.get(&full_key).cloned()
    }
}
