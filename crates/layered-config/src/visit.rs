//! Runtime configuration introspection.
//!
//! Walks a [`Component`] tree and reports, for every declared option, the value
//! the configuration currently resolves to. Useful for logging effective
//! configuration at startup.

use crate::{
    key::normalize_key,
    manager::ConfigManager,
    schema::{Component, ConfigOption},
};

/// One resolved option reported by [`get_runtime_config`].
#[derive(Debug, Clone)]
pub struct RuntimeEntry {
    /// Namespace path of the component declaring the option.
    pub namespace: Vec<String>,
    /// Option name as declared in the schema.
    pub key: String,
    /// Raw resolved value, or `None` if no source and no default supplies one.
    pub value: Option<String>,
    /// The option declaration.
    pub option: ConfigOption,
}

impl RuntimeEntry {
    /// Canonical uppercase key of this entry.
    pub fn full_key(&self) -> String {
        normalize_key(&self.key, &self.namespace)
    }

    /// Value formatted for display: secrets are masked, missing values render
    /// as an empty string.
    pub fn display_value(&self) -> String {
        match &self.value {
            Some(_) if self.option.is_secret() => "*****".to_owned(),
            Some(value) => value.clone(),
            None => String::new(),
        }
    }
}

/// Resolves every option declared by `root` and its descendants.
///
/// Each component's options are resolved with the manager scoped to the
/// component's namespace path and bound to its schema; children are visited
/// under an additional namespace segment per [`Component::children`], whether
/// or not the parent declares options of its own. Values that fail to parse
/// are still reported raw; entries are returned in declaration order,
/// parents before children.
pub fn get_runtime_config(config: &ConfigManager, root: &dyn Component) -> Vec<RuntimeEntry> {
    let mut entries = Vec::new();
    visit(config, root, &mut Vec::new(), &mut entries);
    entries
}

fn visit(
    config: &ConfigManager,
    component: &dyn Component,
    path: &mut Vec<String>,
    entries: &mut Vec<RuntimeEntry>,
) {
    let options = component.config_options();
    if !options.is_empty() {
        let mut scoped = config.clone();
        for segment in path.iter() {
            scoped = scoped.with_namespace(segment);
        }
        let scoped = scoped.with_options(component);
        for (name, option, _) in options.iter() {
            let value = scoped.lookup(name).raw_opt().ok().flatten();
            entries.push(RuntimeEntry {
                namespace: path.clone(),
                key: name.to_owned(),
                value,
                option: option.clone(),
            });
        }
    }

    for (name, child) in component.children() {
        path.push(name);
        visit(config, child, path, entries);
        path.pop();
    }
}
