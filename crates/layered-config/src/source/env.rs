//! Process environment and `.env` file sources.

use std::{collections::BTreeMap, fs, path::{Path, PathBuf}};

use crate::{key::normalize_key, parsing::parse_env_file, testing, ConfigError};

/// Source reading from the process environment.
///
/// Environment variable names are matched exactly against the canonical
/// uppercase key, so only uppercase variables are visible. While a
/// [`MockEnvGuard`](crate::testing::MockEnvGuard) is active on the current
/// thread, only the mocked variables are visible.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEnv;

impl super::Source for OsEnv {
    fn get(&self, key: &str, namespace: &[String]) -> Option<String> {
        let full_key = normalize_key(key, namespace);
        tracing::trace!(%full_key, "searching process environment");
        match testing::mock_env_vars(&full_key) {
            Some(mocked) => mocked,
            None => std::env::var(&full_key).ok(),
        }
    }
}

/// Source backed by a `KEY=value` env file.
///
/// Built from a list of candidate paths; the first existing file is parsed and
/// the rest are ignored. If no candidate exists the source is empty, which
/// makes optional `.env` files in development setups cheap to support.
#[derive(Debug, Clone, Default)]
pub struct EnvFile {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl EnvFile {
    /// Reads and parses the first existing candidate path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or has malformed lines.
    pub fn new(candidates: impl IntoIterator<Item = impl AsRef<Path>>) -> Result<Self, ConfigError> {
        for candidate in candidates {
            let path = candidate.as_ref();
            if !path.exists() {
                continue;
            }
            let contents = fs::read_to_string(path).map_err(|err| {
                ConfigError::Other(format!("error reading env file {path:?}: {err}"))
            })?;
            let entries = parse_env_file(contents.lines())
                .map_err(|err| ConfigError::Other(format!("error in env file {path:?}: {err:#}")))?;
            tracing::debug!(?path, entries = entries.len(), "loaded env file");
            return Ok(Self {
                path: Some(path.to_owned()),
                entries: entries
                    .into_iter()
                    .map(|(key, value)| (key.to_ascii_uppercase(), value))
                    .collect(),
            });
        }
        Ok(Self::default())
    }

    /// Path of the file that was loaded, if any candidate existed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl super::Source for EnvFile {
    fn get(&self, key: &str, namespace: &[String]) -> Option<String> {
        let full_key = normalize_key(key, namespace);
        tracing::trace!(%full_key, path = ?self.path, "searching env file");
        self.entries.get(&full_key).cloned()
    }
}
