//! Configuration sources.
//!
//! A [`Source`] answers point lookups for canonical uppercase keys. Sources are
//! stacked in a [`ConfigManager`](crate::ConfigManager) and consulted in order;
//! the first one returning a value wins.

use std::{collections::BTreeMap, fmt};

use crate::key::normalize_key;

mod env;
mod json;
#[cfg(test)]
mod tests;
mod yaml;

pub use self::{
    env::{EnvFile, OsEnv},
    json::Json,
    yaml::Yaml,
};

/// Provider of raw configuration values.
///
/// Implementations must compose the key and namespace via
/// [`normalize_key`](crate::normalize_key) so that lookups are case-insensitive
/// and namespace-consistent across all sources.
pub trait Source: fmt::Debug + Send + Sync {
    /// Returns the raw value for the key under the namespace, or `None` if
    /// this source has no entry for it.
    fn get(&self, key: &str, namespace: &[String]) -> Option<String>;
}

/// In-memory source backed by a fixed map. Keys are canonicalized at
/// construction, so entries may be supplied in any case.
#[derive(Debug, Clone, Default)]
pub struct Dict {
    entries: BTreeMap<String, String>,
}

impl Dict {
    /// Creates a source from `(key, value)` pairs.
    pub fn new<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, value)| (key.into().to_ascii_uppercase(), value.into()))
                .collect(),
        }
    }
}

impl Source for Dict {
    fn get(&self, key: &str, namespace: &[String]) -> Option<String> {
        let full_key = normalize_key(key, namespace);
        tracing::trace!(%full_key, "searching dict source");
        self.entries.get(&full_key).cloned()
    }
}
