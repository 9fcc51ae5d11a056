//! Error types for the delivery client.

use deliverykit_query::QueryError;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Result type for synchronous client operations (building, configuring).
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type delivered for a dispatched request.
pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Message used when the service reports a failure without one.
pub const GENERIC_ERROR_MESSAGE: &str = "The request could not be completed.";

/// Invalid client or retry configuration.
///
/// Raised by setters before any state changes; the previous valid
/// configuration stays in place.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Retry limit above the supported maximum.
    #[error("retry limit {limit} is out of range: must be between 0 and {max}")]
    RetryLimitOutOfRange {
        /// The rejected limit.
        limit: u32,
        /// Largest accepted limit.
        max: u32,
    },

    /// Status code outside the HTTP range.
    #[error("status code {code} is out of range: must be between {min} and {max}")]
    StatusCodeOutOfRange {
        /// The rejected code.
        code: u16,
        /// Smallest accepted code.
        min: u16,
        /// Largest accepted code.
        max: u16,
    },

    /// The custom strategy was selected without a backoff function.
    #[error("custom backoff strategy requires a backoff function")]
    MissingCustomBackoff,

    /// A required credential or setting is empty.
    #[error("missing required setting: {0}")]
    MissingCredential(&'static str),

    /// Region name not recognized.
    #[error("unknown region: {0}")]
    UnknownRegion(String),
}

/// Synchronous contract violations raised while preparing a request.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Invalid query construction.
    #[error("query error: {0}")]
    Query(#[from] QueryError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be constructed.
    #[error("transport setup failed: {0}")]
    Transport(#[from] TransportError),
}

/// Class of a transport-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The request timed out.
    Timeout,
    /// The connection could not be established or was reset.
    Connection,
    /// Any other failure (TLS, malformed URL, body read).
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Connection => "connection error",
            TransportErrorKind::Other => "transport error",
        };
        f.write_str(name)
    }
}

/// A failure below HTTP: no status code was received.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct TransportError {
    /// Failure class.
    pub kind: TransportErrorKind,
    /// Error message.
    pub message: String,
}

impl TransportError {
    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Timeout,
            message: message.into(),
        }
    }

    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Connection,
            message: message.into(),
        }
    }

    /// Creates an unclassified transport error.
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Other,
            message: message.into(),
        }
    }

    /// Returns true for timeouts and connection failures.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            TransportErrorKind::Timeout | TransportErrorKind::Connection
        )
    }
}

/// Where a delivered error originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No HTTP response was received.
    Transport,
    /// The service answered with a non-2xx status.
    Service,
    /// The response did not match what the request asked for.
    Decode,
}

/// The uniform error delivered for a failed request.
///
/// Missing parts of a service error body degrade to defaults: `message`
/// to [`GENERIC_ERROR_MESSAGE`], `code` to the HTTP status, `details` to
/// `null`.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} (code {code})")]
pub struct DeliveryError {
    /// Where the error originated.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Service error code, or the HTTP status, or 0.
    pub code: i64,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    /// Additional diagnostics attached by the service.
    pub details: Value,
}

impl DeliveryError {
    /// Creates an error for a non-2xx response.
    pub fn service(
        status: u16,
        message: Option<String>,
        code: Option<i64>,
        details: Value,
    ) -> Self {
        Self {
            kind: ErrorKind::Service,
            message: message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string()),
            code: code.unwrap_or(i64::from(status)),
            status: Some(status),
            details,
        }
    }

    /// Creates an error for a request that never produced a response.
    pub fn transport(error: &TransportError) -> Self {
        Self {
            kind: ErrorKind::Transport,
            message: error.to_string(),
            code: 0,
            status: None,
            details: Value::Null,
        }
    }

    /// Creates an error for a response of the wrong shape.
    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Decode,
            message: message.into(),
            code: 0,
            status: None,
            details: Value::Null,
        }
    }
}
