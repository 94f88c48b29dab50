//! Canonical key composition shared by all sources.

/// Generates the canonical uppercase lookup key for a key + namespace pair.
///
/// Empty namespace segments are dropped; the remaining segments and the key are
/// joined with `_` and upper-cased. This function is the single source of truth
/// for key composition: every [`Source`](crate::Source) implementation calls it
/// before consulting its backing data.
///
/// # Examples
///
/// ```
/// # use layered_config::normalize_key;
/// assert_eq!(normalize_key("foo", &[]), "FOO");
/// assert_eq!(normalize_key("foo", &["namespace".into()]), "NAMESPACE_FOO");
/// assert_eq!(
///     normalize_key("foo", &["namespace".into(), "subnamespace".into()]),
///     "NAMESPACE_SUBNAMESPACE_FOO"
/// );
/// ```
pub fn normalize_key(key: &str, namespace: &[String]) -> String {
    let mut parts: Vec<_> = namespace
        .iter()
        .map(String::as_str)
        .filter(|segment| !segment.is_empty())
        .collect();
    parts.push(key);
    parts.join("_").to_ascii_uppercase()
}
