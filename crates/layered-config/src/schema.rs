//! Option schemas for components.
//!
//! A component declares the configuration it consumes as a set of named
//! [`ConfigOption`]s. Binding a [`ConfigManager`](crate::ConfigManager) to a
//! component via [`with_options`](crate::ConfigManager::with_options) restricts
//! lookups to the declared names and pulls defaults, alternate keys, docs and
//! parsers from the schema.

use std::{any, collections::BTreeMap};

use crate::parsing::ParserSpec;

/// Declaration of a single configuration option.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigOption {
    default: Option<String>,
    alternate_keys: Vec<String>,
    doc: String,
    parser: ParserSpec,
    meta: BTreeMap<String, String>,
}

impl Default for ConfigOption {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigOption {
    /// Creates an option with no default, no alternate keys and the identity
    /// (string) parser.
    pub fn new() -> Self {
        Self {
            default: None,
            alternate_keys: Vec::new(),
            doc: String::new(),
            parser: ParserSpec::string(),
            meta: BTreeMap::new(),
        }
    }

    /// Sets the default value. Defaults are unparsed strings, exactly as they
    /// would appear in a source, and go through the option's parser on use.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Sets alternate keys consulted when the primary name yields no value.
    /// A `root:` prefix anchors an alternate key at the top level, ignoring
    /// the active namespace.
    #[must_use]
    pub fn with_alternate_keys(
        mut self,
        keys: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.alternate_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Sets user-facing documentation included in error messages.
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// Sets the parser applied to resolved values.
    #[must_use]
    pub fn with_parser(mut self, parser: ParserSpec) -> Self {
        self.parser = parser;
        self
    }

    /// Attaches an arbitrary metadata entry. The `secret` key with value
    /// `"true"` marks the option's value for masking in runtime dumps.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Default value, if declared.
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Alternate keys, in consultation order.
    pub fn alternate_keys(&self) -> &[String] {
        &self.alternate_keys
    }

    /// Documentation for this option.
    pub fn doc(&self) -> &str {
        &self.doc
    }

    /// Parser applied to resolved values.
    pub fn parser(&self) -> &ParserSpec {
        &self.parser
    }

    /// Metadata entry for `key`, if set.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(String::as_str)
    }

    /// Whether the option is marked as a secret (`meta("secret") == "true"`).
    pub fn is_secret(&self) -> bool {
        self.meta("secret") == Some("true")
    }
}

#[derive(Debug, Clone, PartialEq)]
struct OptionEntry {
    name: String,
    option: ConfigOption,
    owner: &'static str,
}

/// Ordered, owner-attributed set of option declarations.
///
/// Sets compose via [`merge`](Self::merge), which models schema refinement: a
/// derived component re-declaring an option replaces the base declaration while
/// keeping its position, so option ordering stays stable across refinements.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigOptions {
    owner: &'static str,
    entries: Vec<OptionEntry>,
}

impl ConfigOptions {
    /// Creates an empty set owned by component type `C`. The owner name is
    /// reported by introspection tools and in [`Debug`] output.
    pub fn declared_by<C: ?Sized + 'static>() -> Self {
        Self {
            owner: any::type_name::<C>(),
            entries: Vec::new(),
        }
    }

    /// Adds an option. Re-adding an existing name replaces the previous
    /// declaration in place.
    pub fn add(&mut self, name: impl Into<String>, option: ConfigOption) {
        let name = name.into();
        let owner = self.owner;
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.name == name) {
            entry.option = option;
            entry.owner = owner;
        } else {
            self.entries.push(OptionEntry { name, option, owner });
        }
    }

    /// Builder-style [`add`](Self::add).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, option: ConfigOption) -> Self {
        self.add(name, option);
        self
    }

    /// Merges `derived` on top of `self`.
    ///
    /// Options re-declared by `derived` win (declaration and owner) but keep
    /// the position they had in `self`; new options are appended in `derived`
    /// order. The result is owned by `derived`'s owner.
    #[must_use]
    pub fn merge(mut self, derived: Self) -> Self {
        for entry in derived.entries {
            if let Some(existing) = self
                .entries
                .iter_mut()
                .find(|existing| existing.name == entry.name)
            {
                existing.option = entry.option;
                existing.owner = entry.owner;
            } else {
                self.entries.push(entry);
            }
        }
        self.owner = derived.owner;
        self
    }

    /// Looks up a declared option together with the component that declared it.
    pub fn get(&self, name: &str) -> Option<(&ConfigOption, &'static str)> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| (&entry.option, entry.owner))
    }

    /// Type name of the owning component.
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    /// Iterates over `(name, option, owner)` triples in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigOption, &'static str)> + '_ {
        self.entries
            .iter()
            .map(|entry| (entry.name.as_str(), &entry.option, entry.owner))
    }

    /// Whether the set declares no options.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of declared options.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A unit of the application that consumes configuration.
///
/// Implementors declare their options explicitly in [`config_options`] and,
/// optionally, a forest of named sub-components in [`children`] for runtime
/// introspection (see [`get_runtime_config`](crate::get_runtime_config)).
///
/// [`config_options`]: Component::config_options
/// [`children`]: Component::children
pub trait Component {
    /// Option schema of this component.
    fn config_options(&self) -> ConfigOptions;

    /// Named sub-components, each mounted under an additional namespace
    /// segment. The default is no children.
    fn children(&self) -> Vec<(String, &dyn Component)> {
        Vec::new()
    }
}
