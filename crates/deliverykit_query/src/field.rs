//! Field path validation.
//!
//! A field path is a dotted string such as `seo.title`. Only ASCII
//! letters, digits, `_` and `-` are legal inside a segment; segments are
//! separated by single dots.

use crate::error::{QueryError, QueryResult};

/// Validates a field path against the wire protocol's character rules.
pub fn validate_field_path(path: &str) -> QueryResult<()> {
    if path.is_empty() {
        return Err(QueryError::field_path(path, "path is empty"));
    }
    if path.starts_with('.') || path.ends_with('.') {
        return Err(QueryError::field_path(
            path,
            "path must not start or end with '.'",
        ));
    }
    if path.contains("..") {
        return Err(QueryError::field_path(path, "path contains an empty segment"));
    }
    if let Some(c) = path
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        let reason = if c.is_control() {
            "path contains a control character"
        } else if c == '@' {
            "path contains illegal character '@'"
        } else if c.is_whitespace() {
            "path contains whitespace"
        } else {
            "path contains a character outside [A-Za-z0-9_.-]"
        };
        return Err(QueryError::field_path(path, reason));
    }
    Ok(())
}

/// Validates every path in `paths`, returning them as owned strings.
pub(crate) fn validate_all<I, S>(paths: I) -> QueryResult<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    paths
        .into_iter()
        .map(|p| {
            let p = p.as_ref();
            validate_field_path(p).map(|()| p.to_string())
        })
        .collect()
}
