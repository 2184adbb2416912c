//! Error taxonomy for sources, adapters, and the markdown writer.

use std::path::PathBuf;

use pulsearc_common::error::{matches_transient_pattern, ErrorClassification, ErrorSeverity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors a [`crate::Source`] or adapter can return.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SourceError {
    /// A generic, adapter-specific failure. `retryable` is an explicit
    /// flag the adapter sets rather than something derived from the
    /// wrapped message alone.
    #[error("source `{source}` failed during {operation}: {wrapped}")]
    Source {
        source: String,
        operation: String,
        wrapped: String,
        retryable: bool,
    },

    /// Failure to acquire or use a connection (pool checkout, dial,
    /// handshake). Always retryable.
    #[error("source `{source}` could not reach {address}: {wrapped}")]
    Connection {
        source: String,
        address: String,
        wrapped: String,
    },

    /// An operation did not complete within its configured duration.
    /// Always retryable.
    #[error("source `{source}` timed out after {duration_ms}ms during {operation}")]
    Timeout {
        source: String,
        operation: String,
        duration_ms: u64,
    },

    /// A configuration or input value failed validation. Never
    /// retryable: the same input will fail again.
    #[error("source `{source}` rejected field `{field}`: {reason}")]
    Validation {
        source: String,
        field: String,
        reason: String,
    },

    /// A non-2xx HTTP response. Retryable for 5xx and 429 only.
    #[error("source `{source}` received HTTP {status}")]
    Http {
        source: String,
        status: u16,
        body: String,
    },

    /// A GraphQL response carried an `errors[0]` entry. Never retryable:
    /// the same query will fail again until the server-side data changes.
    #[error("source `{source}` GraphQL error: {message}")]
    GraphQl {
        source: String,
        message: String,
        path: Option<String>,
    },

    /// The source's circuit breaker is open and rejected the call
    /// without invoking the adapter.
    #[error("source `{source}` circuit is open")]
    CircuitOpen { source: String },
}

impl SourceError {
    /// Name of the source this error originated from, for logging.
    pub fn source_name(&self) -> &str {
        match self {
            SourceError::Source { source, .. }
            | SourceError::Connection { source, .. }
            | SourceError::Timeout { source, .. }
            | SourceError::Validation { source, .. }
            | SourceError::Http { source, .. }
            | SourceError::GraphQl { source, .. }
            | SourceError::CircuitOpen { source } => source,
        }
    }

    /// Returns a copy of this error with its retryable flag forced to
    /// `false`, used by the retry engine on the last attempt so that an
    /// outer circuit breaker does not retry what the retry engine just
    /// gave up on.
    #[must_use]
    pub fn into_non_retryable(self) -> Self {
        match self {
            SourceError::Source { source, operation, wrapped, .. } => {
                SourceError::Source { source, operation, wrapped, retryable: false }
            }
            other => other,
        }
    }
}

impl ErrorClassification for SourceError {
    fn is_retryable(&self) -> bool {
        let transient = matches_transient_pattern(&self.to_string());
        if transient {
            return true;
        }
        match self {
            SourceError::Source { retryable, .. } => *retryable,
            SourceError::Connection { .. } | SourceError::Timeout { .. } => true,
            SourceError::Validation { .. } | SourceError::GraphQl { .. } => false,
            SourceError::Http { status, .. } => *status >= 500 || *status == 429,
            SourceError::CircuitOpen { .. } => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            SourceError::Validation { .. } => ErrorSeverity::Warning,
            SourceError::CircuitOpen { .. } => ErrorSeverity::Warning,
            SourceError::Timeout { .. } | SourceError::Connection { .. } => ErrorSeverity::Error,
            SourceError::Http { status, .. } if *status >= 500 => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    fn user_friendly(&self) -> String {
        match self {
            SourceError::Validation { field, .. } => {
                format!("The `{field}` setting for this source looks wrong.")
            }
            SourceError::CircuitOpen { .. } => {
                "This source is temporarily unavailable after repeated failures.".to_string()
            }
            SourceError::Timeout { .. } => "This source took too long to respond.".to_string(),
            SourceError::Connection { .. } => "Could not connect to this source.".to_string(),
            SourceError::Http { status, .. } if *status >= 500 => {
                "The upstream server had a problem. Please try again.".to_string()
            }
            SourceError::Http { .. } => "This source rejected the request.".to_string(),
            SourceError::GraphQl { .. } => "This source's query failed.".to_string(),
            SourceError::Source { .. } => "Failed to load data. Please try again.".to_string(),
        }
    }
}

/// Errors from [`crate::WritableSource::write_item`].
#[derive(Error, Debug, Clone)]
pub enum WriteError {
    /// The on-disk file changed underneath a pending write. The other
    /// writer's content was preserved alongside, not overwritten.
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// Any other failure surfaced by the underlying source.
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Detail carried by [`WriteError::Conflict`].
#[derive(Error, Debug, Clone)]
#[error("conflicting edit detected in {}: {message}", original_path.display())]
pub struct ConflictError {
    /// Path to the file that was being written.
    pub original_path: PathBuf,
    /// Path to the sibling copy holding the other writer's content.
    pub conflict_path: PathBuf,
    /// Human-readable explanation.
    pub message: String,
}

impl ErrorClassification for WriteError {
    fn is_retryable(&self) -> bool {
        match self {
            WriteError::Conflict(_) => false,
            WriteError::Source(err) => err.is_retryable(),
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            WriteError::Conflict(_) => ErrorSeverity::Warning,
            WriteError::Source(err) => err.severity(),
        }
    }

    fn user_friendly(&self) -> String {
        match self {
            WriteError::Conflict(_) => {
                "Someone else edited this file. Your change was not applied; review the conflict copy.".to_string()
            }
            WriteError::Source(err) => err.user_friendly(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_5xx_is_retryable_429_is_retryable_4xx_is_not() {
        let server_err = SourceError::Http { source: "s".into(), status: 503, body: String::new() };
        let rate_limited = SourceError::Http { source: "s".into(), status: 429, body: String::new() };
        let bad_request = SourceError::Http { source: "s".into(), status: 400, body: String::new() };
        assert!(server_err.is_retryable());
        assert!(rate_limited.is_retryable());
        assert!(!bad_request.is_retryable());
    }

    #[test]
    fn validation_is_never_retryable() {
        let err = SourceError::Validation { source: "s".into(), field: "url".into(), reason: "missing".into() };
        assert!(!err.is_retryable());
    }

    #[test]
    fn transient_text_forces_retryable_even_on_source_kind() {
        let err = SourceError::Source {
            source: "s".into(),
            operation: "connect".into(),
            wrapped: "connection refused".into(),
            retryable: false,
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn into_non_retryable_clears_the_flag() {
        let err = SourceError::Source {
            source: "s".into(),
            operation: "query".into(),
            wrapped: "boom".into(),
            retryable: true,
        }
        .into_non_retryable();
        assert!(!err.is_retryable());
    }

    #[test]
    fn user_friendly_is_never_empty() {
        let errs = [
            SourceError::CircuitOpen { source: "s".into() },
            SourceError::Timeout { source: "s".into(), operation: "fetch".into(), duration_ms: 30 },
        ];
        for err in errs {
            assert!(!err.user_friendly().is_empty());
        }
    }
}
