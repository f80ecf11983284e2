//! Error handling for breach query operations.
//!
//! `HibpError` covers local validation failures (raised by the query factories
//! before any network call) and the failures a query can hit while executing.
//! Execution failures never cross the dispatcher boundary as `Err`; they are
//! recorded on the request as `Outcome::TransportError`.

use std::fmt;
use std::time::Duration;

/// Main error type for breach query operations.
#[derive(Debug, Clone)]
pub enum HibpError {
    /// Caller-supplied parameter failed local validation
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// Connection-level failures (DNS, refused, reset, TLS)
    NetworkError {
        message: String,
        source: Option<String>,
    },

    /// The service answered with a status the classifier has no rule for
    HttpStatus { status: u16, url: String },

    /// Response body could not be parsed as JSON
    ParseError { message: String },

    /// An operation did not finish within its deadline
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Configuration errors (invalid settings, bad file contents)
    ConfigError { message: String },

    /// File I/O errors when reading query lists or configuration
    FileError { path: String, message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl HibpError {
    /// Create a new invalid input error.
    pub fn invalid_input<F: Into<String>, V: Into<String>, R: Into<String>>(
        field: F,
        value: V,
        reason: R,
    ) -> Self {
        Self::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new unexpected-status error.
    pub fn http_status<U: Into<String>>(status: u16, url: U) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }

    /// Create a new parse error.
    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error is a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether this error came from local parameter validation.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }

    /// Check if this error suggests the operation could be retried.
    ///
    /// The dispatcher never retries on its own; this is advice for callers.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. }
                | Self::Timeout { .. }
                | Self::HttpStatus {
                    status: 429 | 500..=599,
                    ..
                }
        )
    }
}

impl fmt::Display for HibpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput {
                field,
                value,
                reason,
            } => {
                write!(f, "Invalid {} '{}': {}", field, value, reason)
            }
            Self::NetworkError { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::HttpStatus { status, url } => {
                write!(f, "Unexpected HTTP {} from {}", status, url)
            }
            Self::ParseError { message } => {
                write!(f, "Parse error: {}", message)
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for HibpError {}

impl From<reqwest::Error> for HibpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network_with_source("HTTP request timed out", err.to_string())
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else if err.is_decode() || err.is_body() {
            Self::network_with_source("Malformed response", err.to_string())
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<serde_json::Error> for HibpError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(format!("JSON parsing failed: {}", err))
    }
}

impl From<std::io::Error> for HibpError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = HibpError::invalid_input("domain", "bad_domain", "not a hostname");
        assert_eq!(
            err.to_string(),
            "Invalid domain 'bad_domain': not a hostname"
        );

        let err = HibpError::http_status(503, "https://example.test/breaches");
        assert_eq!(
            err.to_string(),
            "Unexpected HTTP 503 from https://example.test/breaches"
        );

        let err = HibpError::network_with_source("Connection failed", "refused");
        assert_eq!(
            err.to_string(),
            "Network error: Connection failed (source: refused)"
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(HibpError::network("reset").is_retryable());
        assert!(HibpError::timeout("batch", Duration::from_secs(1)).is_retryable());
        assert!(HibpError::http_status(429, "u").is_retryable());
        assert!(HibpError::http_status(502, "u").is_retryable());

        assert!(!HibpError::http_status(400, "u").is_retryable());
        assert!(!HibpError::parse("eof").is_retryable());
        assert!(!HibpError::invalid_input("account", "", "empty").is_retryable());
    }

    #[test]
    fn test_serde_error_converts_to_parse_error() {
        let err: HibpError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, HibpError::ParseError { .. }));
    }
}
