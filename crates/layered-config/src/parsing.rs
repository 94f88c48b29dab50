//! Value parsers and the type-erased parser handle used by option schemas.
//!
//! All configuration values are strings until a parser turns them into a typed
//! value. A parser is any `fn(&str) -> anyhow::Result<T>`; [`ParserSpec`] wraps
//! one together with a human-readable name so it can be stored in an option
//! schema and named in error messages. Parser errors are wrapped into
//! [`ConfigError::InvalidValue`](crate::ConfigError::InvalidValue) by the
//! resolution engine, except errors that already are a
//! [`ConfigError`](crate::ConfigError), which propagate unchanged.

use std::{any, any::Any, fmt, str::FromStr, sync::Arc};

use anyhow::Context as _;

type ErasedParseFn = dyn Fn(&str) -> anyhow::Result<Box<dyn Any + Send>> + Send + Sync;

/// Named, type-erased handle to a value parser.
///
/// Cheap to clone; two specs compare equal iff their names match (function
/// identity is not observable).
#[derive(Clone)]
pub struct ParserSpec {
    name: Arc<str>,
    parse: Arc<ErasedParseFn>,
}

impl fmt::Debug for ParserSpec {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("ParserSpec")
            .field(&self.name)
            .finish()
    }
}

impl PartialEq for ParserSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl ParserSpec {
    /// Wraps a parsing function under the provided name.
    pub fn new<T, F>(name: impl Into<Arc<str>>, parse: F) -> Self
    where
        T: Any + Send,
        F: Fn(&str) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            parse: Arc::new(move |raw| Ok(Box::new(parse(raw)?) as Box<dyn Any + Send>)),
        }
    }

    /// Parser delegating to [`FromStr`], named after the target type.
    pub fn of<T>() -> Self
    where
        T: FromStr + Any + Send,
        T::Err: fmt::Display,
    {
        Self::new(short_type_name::<T>(), |raw| {
            raw.parse::<T>().map_err(|err| anyhow::anyhow!("{err}"))
        })
    }

    /// Identity parser returning the raw string.
    pub fn string() -> Self {
        Self::new("str", |raw| Ok(raw.to_owned()))
    }

    /// Boolean parser recognizing the extended token set of [`parse_bool`].
    pub fn bool() -> Self {
        Self::new("bool", parse_bool)
    }

    /// Data size parser; see [`parse_data_size`].
    pub fn data_size() -> Self {
        Self::new("data size", parse_data_size)
    }

    /// Time period parser; see [`parse_time_period`].
    pub fn time_period() -> Self {
        Self::new("time period", parse_time_period)
    }

    /// Parses a comma-separated list of values, each via [`FromStr`].
    ///
    /// Empty input produces an empty `Vec`. Tokens are not trimmed or unquoted;
    /// this doesn't handle quotes, escapes or any complicated string parsing.
    pub fn list_of<T>() -> Self
    where
        T: FromStr + Any + Send,
        T::Err: fmt::Display,
    {
        let name = format!("list of {}", short_type_name::<T>());
        Self::new(name, |raw: &str| {
            if raw.is_empty() {
                return Ok(Vec::<T>::new());
            }
            raw.split(',')
                .map(|token| {
                    token
                        .parse::<T>()
                        .map_err(|err| anyhow::anyhow!("{err} (token {token:?})"))
                })
                .collect()
        })
    }

    /// Human-readable parser name used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn parse_erased(&self, raw: &str) -> anyhow::Result<Box<dyn Any + Send>> {
        (self.parse)(raw)
    }
}

/// Types with a default [`ParserSpec`], usable as lookup results without
/// specifying a parser explicitly.
///
/// Blanket-implemented for every [`FromStr`] type. Note that the `bool` impl is
/// the strict `FromStr` one (`true` / `false` only); use
/// [`ParserSpec::bool()`] for the extended token set.
pub trait FromConfigValue: Any + Send + Sized {
    /// Returns the default parser for this type.
    fn parser_spec() -> ParserSpec;
}

impl<T> FromConfigValue for T
where
    T: FromStr + Any + Send,
    T::Err: fmt::Display,
{
    fn parser_spec() -> ParserSpec {
        ParserSpec::of::<T>()
    }
}

fn short_type_name<T>() -> &'static str {
    let full = any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Parses a bool from an extended token set.
///
/// Recognizes `t`, `true`, `yes`, `y`, `1`, `on` and `f`, `false`, `no`, `n`,
/// `0`, `off`, case-insensitively. You should probably standardize on `true`
/// and `false` anyway.
///
/// # Errors
///
/// Fails on any other input.
pub fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    const TRUE_VALUES: &[&str] = &["t", "true", "yes", "y", "1", "on"];
    const FALSE_VALUES: &[&str] = &["f", "false", "no", "n", "0", "off"];

    let lower = raw.to_ascii_lowercase();
    if TRUE_VALUES.contains(&lower.as_str()) {
        Ok(true)
    } else if FALSE_VALUES.contains(&lower.as_str()) {
        Ok(false)
    } else {
        anyhow::bail!("{raw:?} is not a valid bool value")
    }
}

/// Parses a data size denoted as a number with an optional metric into bytes.
///
/// Supported metrics (case-insensitive): `b`; decimal `kb`, `mb`, `gb`, `tb`;
/// binary `kib`, `mib`, `gib`, `tib`. Digits may be grouped with `_`.
///
/// ```
/// # use layered_config::parsing::parse_data_size;
/// assert_eq!(parse_data_size("40_000_000").unwrap(), 40_000_000);
/// assert_eq!(parse_data_size("40gb").unwrap(), 40_000_000_000);
/// assert_eq!(parse_data_size("20KiB").unwrap(), 20_480);
/// ```
///
/// # Errors
///
/// Fails on an unknown metric, a missing amount, or overflow.
pub fn parse_data_size(raw: &str) -> anyhow::Result<u64> {
    let fixed = raw.trim().to_ascii_lowercase();
    let digits_end = fixed
        .find(|ch: char| !ch.is_ascii_digit() && ch != '_')
        .unwrap_or(fixed.len());
    let (amount, metric) = fixed.split_at(digits_end);

    let multiplier: u64 = match metric {
        "" | "b" => 1,
        "kb" => 1_000,
        "mb" => 1_000_000,
        "gb" => 1_000_000_000,
        "tb" => 1_000_000_000_000,
        "kib" => 1 << 10,
        "mib" => 1 << 20,
        "gib" => 1 << 30,
        "tib" => 1 << 40,
        _ => anyhow::bail!("{raw:?} is not a valid data size"),
    };
    let amount: u64 = amount
        .replace('_', "")
        .parse()
        .map_err(|_| anyhow::anyhow!("{raw:?} is not a valid data size"))?;
    amount
        .checked_mul(multiplier)
        .with_context(|| format!("data size {raw:?} overflows u64"))
}

/// Parses a time period like `15m4s` or `1_000m` into seconds.
///
/// Units: `w` (week), `d` (day), `h` (hour), `m` (minute), `s` (second). A bare
/// number is taken as seconds.
///
/// ```
/// # use layered_config::parsing::parse_time_period;
/// assert_eq!(parse_time_period("103").unwrap(), 103);
/// assert_eq!(parse_time_period("1_000m").unwrap(), 60_000);
/// assert_eq!(parse_time_period("15m4s").unwrap(), 904);
/// ```
///
/// # Errors
///
/// Fails if the input is not a sequence of `<amount><unit>` pairs, or on
/// overflow.
pub fn parse_time_period(raw: &str) -> anyhow::Result<u64> {
    let fixed = raw.trim().to_ascii_lowercase();
    if let Ok(seconds) = fixed.replace('_', "").parse::<u64>() {
        return Ok(seconds);
    }

    let mut chars = fixed.chars().peekable();
    let mut total: u64 = 0;
    let mut parsed_any = false;
    while chars.peek().is_some() {
        let mut digits = String::new();
        while let Some(&ch) = chars.peek() {
            if ch.is_ascii_digit() || ch == '_' {
                digits.push(ch);
                chars.next();
            } else {
                break;
            }
        }
        let amount: u64 = digits
            .replace('_', "")
            .parse()
            .map_err(|_| anyhow::anyhow!("{raw:?} is not a valid time period"))?;

        let multiplier: u64 = match chars.next() {
            Some('w') => 7 * 24 * 60 * 60,
            Some('d') => 24 * 60 * 60,
            Some('h') => 60 * 60,
            Some('m') => 60,
            Some('s') => 1,
            _ => anyhow::bail!("{raw:?} is not a valid time period"),
        };
        let part = amount
            .checked_mul(multiplier)
            .with_context(|| format!("time period {raw:?} overflows u64"))?;
        total = total
            .checked_add(part)
            .with_context(|| format!("time period {raw:?} overflows u64"))?;
        parsed_any = true;
    }

    if !parsed_any {
        anyhow::bail!("{raw:?} is not a valid time period");
    }
    Ok(total)
}

/// Parses the contents of a `.env`-style file into key–value pairs.
///
/// `KEY=value` lines; blank lines and `#` comments are skipped; one round of
/// matching `'` or `"` quotes is stripped from the value. Keys must match
/// `[A-Za-z][A-Za-z0-9_]*`.
///
/// # Errors
///
/// Fails on a line without `=` or with an invalid key, naming the 1-based line
/// number.
pub fn parse_env_file<'a>(
    lines: impl IntoIterator<Item = &'a str>,
) -> anyhow::Result<Vec<(String, String)>> {
    let mut entries = Vec::new();
    for (idx, line) in lines.into_iter().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            anyhow::bail!("env file line missing = operator (line {})", idx + 1);
        };

        let key = key.trim();
        if !is_valid_env_key(key) {
            anyhow::bail!("invalid variable name {key:?} in env file (line {})", idx + 1);
        }

        let mut value = value.trim();
        for quote in ['\'', '"'] {
            if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
                value = &value[1..value.len() - 1];
                break;
            }
        }
        entries.push((key.to_owned(), value.to_owned()));
    }
    Ok(entries)
}

fn is_valid_env_key(key: &str) -> bool {
    let mut chars = key.chars();
    chars.next().is_some_and(|ch| ch.is_ascii_alphabetic())
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parsing_bools() {
        for token in ["y", "YES", "1", "on", "True"] {
            assert!(parse_bool(token).unwrap(), "{token}");
        }
        for token in ["n", "FALSE", "0", "off", "f"] {
            assert!(!parse_bool(token).unwrap(), "{token}");
        }

        let err = parse_bool("bar").unwrap_err().to_string();
        assert!(err.contains("\"bar\""), "{err}");
    }

    #[test]
    fn parsing_data_sizes() {
        assert_eq!(parse_data_size("10b").unwrap(), 10);
        assert_eq!(parse_data_size("100kb").unwrap(), 100_000);
        assert_eq!(parse_data_size("23gib").unwrap(), 23 * (1 << 30));
        assert_eq!(parse_data_size(" 5MB ").unwrap(), 5_000_000);

        assert!(parse_data_size("ten").is_err());
        assert!(parse_data_size("10xb").is_err());
        assert!(parse_data_size("kb").is_err());
    }

    #[test]
    fn parsing_time_periods() {
        assert_eq!(parse_time_period("1w").unwrap(), 604_800);
        assert_eq!(parse_time_period("2d3h").unwrap(), 2 * 86_400 + 3 * 3_600);
        assert_eq!(parse_time_period("90S").unwrap(), 90);

        assert!(parse_time_period("").is_err());
        assert!(parse_time_period("15x").is_err());
        assert!(parse_time_period("m15").is_err());
    }

    #[test]
    fn parsing_lists() {
        let spec = ParserSpec::list_of::<u32>();
        let parsed = spec.parse_erased("1,2,3").unwrap();
        assert_eq!(*parsed.downcast::<Vec<u32>>().unwrap(), vec![1, 2, 3]);

        let parsed = spec.parse_erased("").unwrap();
        assert!(parsed.downcast::<Vec<u32>>().unwrap().is_empty());

        let err = spec.parse_erased("1,x,3").unwrap_err().to_string();
        assert!(err.contains("\"x\""), "{err}");
    }

    #[test]
    fn parsing_env_files() {
        let entries = parse_env_file([
            "DUDE=Abides",
            "",
            "# comment",
            "QUOTED=\"'self' www.example.com\"",
            "SPACED = value ",
        ])
        .unwrap();
        assert_eq!(
            entries,
            [
                ("DUDE".to_owned(), "Abides".to_owned()),
                ("QUOTED".to_owned(), "'self' www.example.com".to_owned()),
                ("SPACED".to_owned(), "value".to_owned()),
            ]
        );
    }

    #[test]
    fn env_file_errors() {
        let err = parse_env_file(["NO_OPERATOR"]).unwrap_err().to_string();
        assert!(err.contains("line 1"), "{err}");

        let err = parse_env_file(["OK=1", "2BAD=x"]).unwrap_err().to_string();
        assert!(err.contains("\"2BAD\"") && err.contains("line 2"), "{err}");
    }

    #[test]
    fn specs_compare_by_name() {
        assert_eq!(ParserSpec::of::<u16>(), ParserSpec::new("u16", |raw| raw.parse::<u16>().map_err(Into::into)));
        assert_ne!(ParserSpec::of::<u16>(), ParserSpec::of::<u32>());
    }

    #[test]
    fn from_str_spec_names() {
        assert_eq!(ParserSpec::of::<u16>().name(), "u16");
        assert_eq!(ParserSpec::of::<String>().name(), "String");
        assert_eq!(ParserSpec::list_of::<u8>().name(), "list of u8");
    }

    #[test]
    fn erased_parsing_is_typed() {
        let spec = ParserSpec::of::<u16>();
        let parsed = spec.parse_erased("8000").unwrap();
        assert_matches!(parsed.downcast::<u16>(), Ok(port) if *port == 8000);
    }
}
