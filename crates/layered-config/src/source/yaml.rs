//! YAML file source.

use std::collections::BTreeMap;

use anyhow::Context as _;
use serde_yaml::{Mapping, Value};

use crate::key::normalize_key;

/// Source backed by a YAML mapping.
///
/// Nested mappings are flattened into canonical keys: `db: { port: 5432 }`
/// becomes `DB_PORT = "5432"`. Scalar leaves (strings, numbers, booleans) are
/// stringified; nulls are skipped. Sequences and tagged values are rejected at
/// construction since they have no string form a parser could round-trip.
#[derive(Debug, Clone, Default)]
pub struct Yaml {
    filename: String,
    entries: BTreeMap<String, String>,
}

impl Yaml {
    /// Flattens the provided mapping. `filename` is only used in error and log
    /// messages.
    ///
    /// # Errors
    ///
    /// Returns an error on non-scalar leaves or non-stringlike mapping keys.
    pub fn new(filename: &str, mapping: Mapping) -> anyhow::Result<Self> {
        let mut entries = BTreeMap::new();
        flatten(&mut entries, &mut Vec::new(), mapping)
            .with_context(|| format!("error reading YAML config {filename:?}"))?;
        tracing::debug!(filename, entries = entries.len(), "loaded YAML config");
        Ok(Self {
            filename: filename.to_owned(),
            entries,
        })
    }

    /// Parses YAML text and flattens the top-level mapping.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid YAML, a non-mapping top level, or the
    /// conditions of [`Self::new`].
    pub fn from_str(filename: &str, text: &str) -> anyhow::Result<Self> {
        let value: Value = serde_yaml::from_str(text)
            .with_context(|| format!("error parsing YAML config {filename:?}"))?;
        let Value::Mapping(mapping) = value else {
            anyhow::bail!("YAML config {filename:?} must have a mapping at the top level");
        };
        Self::new(filename, mapping)
    }
}

fn flatten(
    entries: &mut BTreeMap<String, String>,
    path: &mut Vec<String>,
    mapping: Mapping,
) -> anyhow::Result<()> {
    for (key, value) in mapping {
        let key = stringify_key(&key)
            .with_context(|| format!("unsupported mapping key at {}", path.join(".")))?;
        match value {
            Value::Mapping(nested) => {
                path.push(key);
                flatten(entries, path, nested)?;
                path.pop();
            }
            Value::Null => { /* no value; the key is absent */ }
            Value::Bool(value) => insert_leaf(entries, path, &key, value.to_string()),
            Value::Number(value) => insert_leaf(entries, path, &key, value.to_string()),
            Value::String(value) => insert_leaf(entries, path, &key, value),
            Value::Sequence(_) | Value::Tagged(_) => {
                path.push(key);
                anyhow::bail!("unsupported value at {}; only scalars and mappings are allowed", path.join("."));
            }
        }
    }
    Ok(())
}

fn stringify_key(key: &Value) -> Option<String> {
    match key {
        Value::String(key) => Some(key.clone()),
        Value::Number(key) => Some(key.to_string()),
        Value::Bool(key) => Some(key.to_string()),
        _ => None,
    }
}

fn insert_leaf(
    entries: &mut BTreeMap<String, String>,
    path: &[String],
    key: &str,
    value: String,
) {
    entries.insert(normalize_key(key, path), value);
}

impl super::Source for Yaml {
    fn get(&self, key: &str, namespace: &[String]) -> Option<String> {
        let full_key = normalize_key(key, namespace);
        tracing::trace!(%full_key, filename = %self.filename, "searching YAML source");
        self.entries.get(&full_key).cloned()
    }
}
