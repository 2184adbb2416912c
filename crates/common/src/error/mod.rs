//! Shared error-classification vocabulary.
//!
//! Every module-specific error type in this workspace (`SourceError`,
//! `WriteError`, ...) implements [`ErrorClassification`] rather than
//! duplicating retry/severity logic inline. This keeps the retry engine and
//! circuit breaker (which only need "is this retryable") decoupled from any
//! one error enum's variants.

use std::fmt;

/// How serious an error is, independent of whether it's retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
            ErrorSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Classification surface the retry engine, circuit breaker, and UI-facing
/// error rendering all consult, without needing to match on a concrete
/// error enum's variants.
pub trait ErrorClassification {
    /// Whether retrying the operation that produced this error might
    /// succeed.
    fn is_retryable(&self) -> bool;

    /// Severity for logging/alerting purposes.
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Error
    }

    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    /// A one-sentence message safe to show a user, with no internal
    /// detail (hostnames, stack traces, query text).
    fn user_friendly(&self) -> String {
        "Failed to load data. Please try again.".to_string()
    }
}

/// Substrings that mark an error as transient regardless of its declared
/// kind, matched case-insensitively against the error's `Display` output.
/// See the Source error taxonomy for where this is consulted.
pub const TRANSIENT_PATTERNS: &[&str] = &[
    "connection refused",
    "connection reset",
    "no such host",
    "timeout",
    "deadline exceeded",
    "temporary failure",
    "try again",
    "service unavailable",
    "bad gateway",
    "gateway timeout",
];

/// Case-insensitive substring match against [`TRANSIENT_PATTERNS`].
pub fn matches_transient_pattern(text: &str) -> bool {
    let lower = text.to_lowercase();
    TRANSIENT_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}
