//! Layered configuration resolution.
//!
//! Configuration is read from an ordered stack of [`Source`]s (process
//! environment, env files, YAML / JSON files, in-memory maps); the first
//! source that has a value for a key wins. Keys compose with namespaces into
//! canonical uppercase names (`db` + `port` → `DB_PORT`), values are strings
//! until a parser turns them into typed values, and components can declare
//! their options up front via [`ConfigOptions`] schemas.
//!
//! # Examples
//!
//! ```
//! use layered_config::ConfigManager;
//!
//! let config = ConfigManager::from_dict([
//!     ("DB_USERNAME", "app"),
//!     ("DB_PASSWORD", "hunter2"),
//! ]);
//! let db_config = config.with_namespace("db");
//!
//! let username: String = db_config.get("username")?;
//! assert_eq!(username, "app");
//! // Defaults are unparsed strings and go through the same parser.
//! let port: u16 = db_config.lookup("port").default("5432").parse()?;
//! assert_eq!(port, 5432);
//! # anyhow::Ok(())
//! ```
//!
//! Tests can override any key through the manager's [`testing::OverrideStack`]
//! without touching the process environment:
//!
//! ```
//! use layered_config::ConfigManager;
//!
//! let config = ConfigManager::from_dict([("PORT", "8000")]);
//! let overrides = config.overrides().unwrap().clone();
//! overrides.with_overrides([("PORT", "9000")], || {
//!     assert_eq!(config.get::<u16>("port").unwrap(), 9000);
//! });
//! assert_eq!(config.get::<u16>("port").unwrap(), 8000);
//! ```

// Linter settings.
#![warn(missing_docs, missing_debug_implementations)]

mod error;
mod key;
mod manager;
pub mod parsing;
mod schema;
mod source;
pub mod testing;
mod visit;

pub use self::{
    error::{build_message, ConfigError, ErrorContext, MessageBuilder, MessageContext},
    key::normalize_key,
    manager::{ConfigManager, ConfigManagerBuilder, Lookup},
    parsing::{FromConfigValue, ParserSpec},
    schema::{Component, ConfigOption, ConfigOptions},
    source::{Dict, EnvFile, Json, OsEnv, Source, Yaml},
    visit::{get_runtime_config, RuntimeEntry},
};
