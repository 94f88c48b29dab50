//! Configuration manager: source stacking, namespacing and lookup resolution.

use std::{any::Any, fmt, mem, path::Path, sync::Arc};

use crate::{
    error::{build_message, ConfigError, ErrorContext, MessageBuilder, MessageContext},
    parsing::{FromConfigValue, ParserSpec},
    schema::{Component, ConfigOptions},
    source::{Dict, EnvFile, OsEnv, Source},
    testing::OverrideStack,
};

struct ManagerCore {
    sources: Vec<Box<dyn Source>>,
    overrides: Option<OverrideStack>,
    doc: String,
    msg_builder: MessageBuilder,
    default_if_empty: bool,
}

impl fmt::Debug for ManagerCore {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ManagerCore")
            .field("sources", &self.sources)
            .field("doc", &self.doc)
            .field("default_if_empty", &self.default_if_empty)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
struct BoundOptions {
    component: &'static str,
    options: Arc<ConfigOptions>,
}

/// Builder for [`ConfigManager`]s. Sources are consulted in the order they are
/// added; the first value found wins.
#[derive(Debug)]
#[must_use = "the builder does nothing until `build()` is called"]
pub struct ConfigManagerBuilder {
    sources: Vec<Box<dyn Source>>,
    doc: String,
    msg_builder: MessageBuilder,
    default_if_empty: bool,
    with_override: bool,
}

impl Default for ConfigManagerBuilder {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            doc: String::new(),
            msg_builder: build_message,
            default_if_empty: true,
            with_override: true,
        }
    }
}

impl ConfigManagerBuilder {
    /// Appends a source to the end of the stack.
    pub fn source(mut self, source: impl Source + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Sets project-level documentation appended to every error message
    /// (typically a pointer to the project's configuration docs).
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// Replaces the default error message formatting.
    pub fn message_builder(mut self, builder: MessageBuilder) -> Self {
        self.msg_builder = builder;
        self
    }

    /// Makes empty string values count as present. By default an empty value
    /// is treated as unset and resolution falls through to later sources and
    /// the default.
    pub fn keep_empty_values(mut self) -> Self {
        self.default_if_empty = false;
        self
    }

    /// Builds the manager without an override stack. Lookups then skip the
    /// override check entirely and [`ConfigManager::overrides`] returns `None`.
    pub fn no_override_layer(mut self) -> Self {
        self.with_override = false;
        self
    }

    /// Builds the manager.
    pub fn build(self) -> ConfigManager {
        ConfigManager {
            core: Arc::new(ManagerCore {
                sources: self.sources,
                overrides: self.with_override.then(OverrideStack::new),
                doc: self.doc,
                msg_builder: self.msg_builder,
                default_if_empty: self.default_if_empty,
            }),
            namespace: Vec::new(),
            bound: None,
            bound_prefix: Vec::new(),
        }
    }
}

/// Facade over an ordered stack of configuration [`Source`]s.
///
/// Cloning is cheap and shares the source stack; [`Self::with_namespace`] and
/// [`Self::with_options`] return scoped views over the same stack.
///
/// # Examples
///
/// ```
/// use layered_config::{ConfigManager, Dict, OsEnv};
///
/// let config = ConfigManager::builder()
///     .source(OsEnv)
///     .source(Dict::new([("DB_PORT", "5432")]))
///     .doc("See https://example.com/config for details.")
///     .build();
/// let port: u16 = config.with_namespace("db").get("port")?;
/// assert_eq!(port, 5432);
/// # anyhow::Ok(())
/// ```
#[derive(Clone)]
pub struct ConfigManager {
    core: Arc<ManagerCore>,
    namespace: Vec<String>,
    bound: Option<BoundOptions>,
    bound_prefix: Vec<String>,
}

impl fmt::Debug for ConfigManager {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ConfigManager")
            .field("namespace", &self.namespace)
            .field(
                "bound_component",
                &self.bound.as_ref().map(|bound| bound.component),
            )
            .finish_non_exhaustive()
    }
}

impl ConfigManager {
    /// Starts building a manager.
    pub fn builder() -> ConfigManagerBuilder {
        ConfigManagerBuilder::default()
    }

    /// Creates a manager over the provided sources with default settings.
    pub fn new(sources: Vec<Box<dyn Source>>) -> Self {
        let mut builder = Self::builder();
        builder.sources = sources;
        builder.build()
    }

    /// Creates a manager over a single in-memory map. Handy in tests.
    pub fn from_dict<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::builder().source(Dict::new(entries)).build()
    }

    /// Creates a manager with the common setup: process environment first,
    /// then the first existing env file among `env_file_candidates`.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing env file cannot be read or parsed.
    pub fn basic(
        env_file_candidates: impl IntoIterator<Item = impl AsRef<Path>>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::builder()
            .source(OsEnv)
            .source(EnvFile::new(env_file_candidates)?)
            .build())
    }

    /// Override stack of this manager, or `None` if it was built with
    /// [`ConfigManagerBuilder::no_override_layer`]. All scoped views of a
    /// manager share one stack.
    pub fn overrides(&self) -> Option<&OverrideStack> {
        self.core.overrides.as_ref()
    }

    /// Active namespace segments.
    pub fn get_namespace(&self) -> &[String] {
        &self.namespace
    }

    /// Type name of the bound component, if any.
    pub fn bound_component(&self) -> Option<&'static str> {
        self.bound.as_ref().map(|bound| bound.component)
    }

    /// Project-level documentation.
    pub fn doc(&self) -> &str {
        &self.core.doc
    }

    /// Returns a view with `namespace` appended to the active namespace.
    /// An empty segment is a no-op.
    ///
    /// On a bound manager the segment prefixes option names instead of
    /// extending the lookup namespace, matching how nested option names are
    /// declared in the schema.
    #[must_use]
    pub fn with_namespace(&self, namespace: &str) -> Self {
        let mut this = self.clone();
        if namespace.is_empty() {
            return this;
        }
        if this.bound.is_some() {
            this.bound_prefix.push(namespace.to_owned());
        } else {
            this.namespace.push(namespace.to_owned());
        }
        this
    }

    /// Returns a view bound to `component`'s option schema.
    ///
    /// Lookups on the bound view are restricted to declared option names and
    /// pull defaults, alternate keys, docs and parsers from the schema.
    /// Binding to a component with no declared options returns an unrestricted
    /// view. Namespace segments accumulated after a previous binding become
    /// part of the lookup namespace before the new binding applies.
    #[must_use]
    pub fn with_options(&self, component: &dyn Component) -> Self {
        let mut this = self.clone();
        let flushed = mem::take(&mut this.bound_prefix);
        this.namespace.extend(flushed);

        let options = component.config_options();
        if options.is_empty() {
            this.bound = None;
        } else {
            this.bound = Some(BoundOptions {
                component: options.owner(),
                options: Arc::new(options),
            });
        }
        this
    }

    /// Starts a lookup for `key`. Terminal methods on the returned builder
    /// perform the resolution.
    pub fn lookup<'a>(&'a self, key: &'a str) -> Lookup<'a> {
        Lookup {
            manager: self,
            key,
            namespace: Vec::new(),
            default: None,
            alternate_keys: Vec::new(),
            doc: String::new(),
            parser: None,
        }
    }

    /// Resolves `key` and parses it with `T`'s default parser.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is missing or its value fails to parse.
    pub fn get<T: FromConfigValue>(&self, key: &str) -> Result<T, ConfigError> {
        self.lookup(key).parse()
    }

    /// Builds an application-level configuration error carrying this manager's
    /// documentation, for validation that spans multiple keys.
    pub fn configuration_error(&self, msg: &str) -> ConfigError {
        let message = (self.core.msg_builder)(&MessageContext {
            msg,
            manager_doc: &self.core.doc,
            ..MessageContext::default()
        });
        ConfigError::Other(message)
    }

    fn resolve(
        &self,
        request: &Lookup<'_>,
        fallback_parser: Option<ParserSpec>,
        raise_error: bool,
        raw_value: bool,
    ) -> Result<Option<Box<dyn Any + Send>>, ConfigError> {
        let mut key = request.key.to_owned();
        let mut namespace = self.namespace.clone();
        let mut default = request.default.clone();
        let mut alternate_keys = request.alternate_keys.clone();
        let mut doc = request.doc.clone();
        // Precedence: explicit lookup parser, then the bound schema's parser,
        // then the fallback derived from the requested type.
        let mut parser = request.parser.clone();

        if let Some(bound) = &self.bound {
            let mut name_parts = self.bound_prefix.clone();
            name_parts.extend(request.namespace.iter().cloned());
            name_parts.push(key);
            key = name_parts.join("_");

            let Some((option, _)) = bound.options.get(&key) else {
                if raise_error {
                    return Err(ConfigError::InvalidKey { key });
                }
                return Ok(None);
            };
            if default.is_none() {
                default = option.default_value().map(str::to_owned);
            }
            if alternate_keys.is_empty() {
                alternate_keys = option.alternate_keys().to_vec();
            }
            if doc.is_empty() {
                doc = option.doc().to_owned();
            }
            if parser.is_none() {
                parser = Some(option.parser().clone());
            }
        } else {
            namespace.extend(request.namespace.iter().cloned());
        }
        let parser = parser.or(fallback_parser).unwrap_or_else(ParserSpec::string);

        const EMPTY_NS: &[String] = &[];
        let mut candidates = vec![key.as_str()];
        candidates.extend(alternate_keys.iter().map(String::as_str));

        for candidate in candidates {
            let (candidate, candidate_ns) = match candidate.strip_prefix("root:") {
                Some(anchored) => (anchored, EMPTY_NS),
                None => (candidate, &namespace[..]),
            };
            tracing::debug!(key = candidate, namespace = ?candidate_ns, "looking up key");

            let override_source = self
                .core
                .overrides
                .iter()
                .filter(|stack| !stack.is_empty())
                .map(|stack| stack as &dyn Source);
            let sources = override_source
                .chain(self.core.sources.iter().map(AsRef::as_ref));
            for source in sources {
                let Some(raw) = source.get(candidate, candidate_ns) else {
                    continue;
                };
                if raw.is_empty() && self.core.default_if_empty {
                    continue;
                }
                return self
                    .parse_value(&raw, "", &key, &namespace, &doc, &parser, raw_value)
                    .map(Some);
            }
        }

        if let Some(default) = default {
            return self
                .parse_value(
                    &default,
                    " (default value)",
                    &key,
                    &namespace,
                    &doc,
                    &parser,
                    raw_value,
                )
                .map(Some);
        }

        if raise_error {
            let message = (self.core.msg_builder)(&MessageContext {
                namespace: Some(&namespace),
                key: Some(&key),
                parser: Some(parser.name()),
                msg: "",
                option_doc: &doc,
                manager_doc: &self.core.doc,
            });
            return Err(ConfigError::Missing(ErrorContext {
                message,
                namespace,
                key,
                parser: parser.name().to_owned(),
            }));
        }
        Ok(None)
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_value(
        &self,
        raw: &str,
        note: &str,
        key: &str,
        namespace: &[String],
        doc: &str,
        parser: &ParserSpec,
        raw_value: bool,
    ) -> Result<Box<dyn Any + Send>, ConfigError> {
        if raw_value {
            return Ok(Box::new(raw.to_owned()));
        }
        match parser.parse_erased(raw) {
            Ok(parsed) => Ok(parsed),
            // Parsers may signal application errors directly; pass them through.
            Err(err) => match err.downcast::<ConfigError>() {
                Ok(config_err) => Err(config_err),
                Err(err) => {
                    let msg = format!("{err:#}{note}");
                    let message = (self.core.msg_builder)(&MessageContext {
                        namespace: Some(namespace),
                        key: Some(key),
                        parser: Some(parser.name()),
                        msg: &msg,
                        option_doc: doc,
                        manager_doc: &self.core.doc,
                    });
                    Err(ConfigError::InvalidValue {
                        context: ErrorContext {
                            message,
                            namespace: namespace.to_vec(),
                            key: key.to_owned(),
                            parser: parser.name().to_owned(),
                        },
                        source: err,
                    })
                }
            },
        }
    }
}

/// Builder for a single configuration lookup. Created by
/// [`ConfigManager::lookup`]; terminated by [`Self::parse`],
/// [`Self::parse_opt`], [`Self::raw`] or [`Self::raw_opt`].
#[derive(Debug)]
#[must_use = "the lookup does nothing until a terminal method is called"]
pub struct Lookup<'a> {
    manager: &'a ConfigManager,
    key: &'a str,
    namespace: Vec<String>,
    default: Option<String>,
    alternate_keys: Vec<String>,
    doc: String,
    parser: Option<ParserSpec>,
}

impl Lookup<'_> {
    /// Appends a namespace segment for this lookup only.
    pub fn namespace(mut self, namespace: &str) -> Self {
        if !namespace.is_empty() {
            self.namespace.push(namespace.to_owned());
        }
        self
    }

    /// Sets the default, an unparsed string that goes through the parser like
    /// any source value.
    pub fn default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Sets alternate keys consulted when the primary key yields no value.
    /// Prefix a key with `root:` to anchor it at the top level, ignoring the
    /// active namespace.
    pub fn alternate_keys(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.alternate_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Sets documentation included in error messages for this lookup.
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// Sets the parser explicitly instead of using `T`'s default parser.
    pub fn parser(mut self, parser: ParserSpec) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Resolves the lookup and parses the value as `T`.
    ///
    /// The parser is chosen in order of precedence: one set via
    /// [`Self::parser`], then the bound schema's parser (if any), then `T`'s
    /// default parser. The parsed value must be a `T` either way.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if no source and no default supplies a
    /// value, and [`ConfigError::InvalidValue`] if parsing fails.
    pub fn parse<T: FromConfigValue>(self) -> Result<T, ConfigError> {
        let resolved = self
            .manager
            .resolve(&self, Some(T::parser_spec()), true, false)?;
        // `resolve` with `raise_error` never returns an empty value.
        let resolved = resolved.ok_or_else(|| {
            ConfigError::Other(format!("no value resolved for key {:?}", self.key))
        })?;
        downcast(resolved, &self)
    }

    /// Like [`Self::parse`], but a missing value yields `Ok(None)` instead of
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a value is present but fails
    /// to parse.
    pub fn parse_opt<T: FromConfigValue>(self) -> Result<Option<T>, ConfigError> {
        let Some(resolved) = self
            .manager
            .resolve(&self, Some(T::parser_spec()), false, false)?
        else {
            return Ok(None);
        };
        downcast(resolved, &self).map(Some)
    }

    /// Resolves the lookup and returns the raw string, bypassing the parser.
    /// Bound-component key restrictions and defaults still apply.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if no source and no default supplies a
    /// value.
    pub fn raw(self) -> Result<String, ConfigError> {
        let resolved = self.manager.resolve(&self, None, true, true)?;
        let resolved = resolved.ok_or_else(|| {
            ConfigError::Other(format!("no value resolved for key {:?}", self.key))
        })?;
        downcast(resolved, &self)
    }

    /// Like [`Self::raw`], but a missing value (or an undeclared key on a
    /// bound manager) yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` keeps the terminal signatures
    /// uniform.
    pub fn raw_opt(self) -> Result<Option<String>, ConfigError> {
        let Some(resolved) = self.manager.resolve(&self, None, false, true)? else {
            return Ok(None);
        };
        downcast(resolved, &self).map(Some)
    }
}

fn downcast<T: Any>(value: Box<dyn Any + Send>, request: &Lookup<'_>) -> Result<T, ConfigError> {
    value.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
        ConfigError::Other(format!(
            "parser for key {:?} produced a value of a different type than requested",
            request.key,
        ))
    })
}
