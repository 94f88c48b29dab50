//! Configuration error taxonomy and message composition.

use std::fmt;

use crate::key::normalize_key;

/// Inputs for composing a human-readable configuration error message.
///
/// Passed to the [`MessageBuilder`] installed on a manager, so applications can
/// replace the default formatting wholesale.
#[derive(Debug, Default)]
pub struct MessageContext<'a> {
    /// Namespace the lookup ran under, if any.
    pub namespace: Option<&'a [String]>,
    /// Key that was looked up, if any.
    pub key: Option<&'a str>,
    /// Name of the parser the value must satisfy, if any.
    pub parser: Option<&'a str>,
    /// Free-text error message (e.g., the parser failure).
    pub msg: &'a str,
    /// Documentation attached to the option being resolved.
    pub option_doc: &'a str,
    /// Documentation attached to the manager itself.
    pub manager_doc: &'a str,
}

/// Function composing error text from a [`MessageContext`].
pub type MessageBuilder = fn(&MessageContext<'_>) -> String;

/// Default [`MessageBuilder`]: newline-joined lines, skipping empty parts.
///
/// The composed message contains, in order: the free-text message, a
/// `KEY requires a value parseable by <parser>` line, the option docs and the
/// manager ("project") docs.
pub fn build_message(ctx: &MessageContext<'_>) -> String {
    let mut lines = Vec::with_capacity(4);
    if !ctx.msg.is_empty() {
        lines.push(ctx.msg.to_owned());
    }

    let full_key = match (ctx.key, ctx.parser) {
        (Some(key), Some(parser)) => {
            let full_key = normalize_key(key, ctx.namespace.unwrap_or(&[]));
            lines.push(format!("{full_key} requires a value parseable by {parser}"));
            Some(full_key)
        }
        _ => None,
    };
    if let (Some(full_key), false) = (&full_key, ctx.option_doc.is_empty()) {
        lines.push(format!("{full_key} docs: {}", ctx.option_doc));
    }
    if !ctx.manager_doc.is_empty() {
        lines.push(format!("Project docs: {}", ctx.manager_doc));
    }
    lines.join("\n")
}

/// Structured context carried by [`ConfigError::Missing`] and [`ConfigError::InvalidValue`].
#[derive(Debug)]
pub struct ErrorContext {
    /// Composed multi-line message (see [`build_message`]).
    pub message: String,
    /// Namespace the lookup ran under.
    pub namespace: Vec<String>,
    /// Key that was looked up (after bound-component prefixing, if any).
    pub key: String,
    /// Name of the parser the value must satisfy.
    pub parser: String,
}

/// Errors produced by configuration resolution.
#[derive(Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// No source and no default supplied a value for a required key.
    Missing(ErrorContext),
    /// A source (or the default) produced a string the parser rejected.
    InvalidValue {
        /// Structured lookup context.
        context: ErrorContext,
        /// The underlying parser error.
        source: anyhow::Error,
    },
    /// The key is not declared in the bound component's option schema.
    InvalidKey {
        /// The offending key.
        key: String,
    },
    /// Programmer error or application-level validation failure.
    Other(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(context) | Self::InvalidValue { context, .. } => {
                formatter.write_str(&context.message)
            }
            Self::InvalidKey { key } => {
                write!(formatter, "{key:?} is not a valid key for this component")
            }
            Self::Other(message) => formatter.write_str(message),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidValue { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
