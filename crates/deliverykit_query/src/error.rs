//! Error types for query construction.

use thiserror::Error;

/// Result type for query construction.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while building a query.
///
/// These are contract violations made by the calling code. They surface
/// synchronously at the call that introduced them and are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A field path is empty or contains characters the wire protocol rejects.
    #[error("invalid field path {path:?}: {reason}")]
    InvalidFieldPath {
        /// The rejected path.
        path: String,
        /// Which rule the path violated.
        reason: &'static str,
    },

    /// A raw parameter key is empty or contains whitespace or control characters.
    #[error("invalid parameter key {0:?}")]
    InvalidParameterKey(String),

    /// A predicate operand has no wire form, such as a NaN or infinite float.
    #[error("invalid operand for {path:?}: {reason}")]
    InvalidOperand {
        /// The field path the operand was meant for.
        path: String,
        /// Why the operand was rejected.
        reason: &'static str,
    },

    /// Regex options contain a flag the service does not understand.
    #[error("invalid regex options {options:?}: unsupported flag {flag:?}")]
    InvalidRegexOptions {
        /// The rejected options string.
        options: String,
        /// The first unsupported flag.
        flag: char,
    },
}

impl QueryError {
    pub(crate) fn field_path(path: &str, reason: &'static str) -> Self {
        Self::InvalidFieldPath {
            path: path.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_the_path() {
        let err = QueryError::field_path("bad@path", "illegal character '@'");
        let text = err.to_string();
        assert!(text.contains("bad@path"));
        assert!(text.contains("'@'"));
    }
}
