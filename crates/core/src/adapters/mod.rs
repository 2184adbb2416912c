//! Concrete [`crate::source::Source`] implementations, one per descriptor
//! kind.
//!
//! Every adapter follows the same envelope: validate its config at
//! construction (failing with [`SourceError::Validation`]), acquire
//! whatever resource it holds between fetches, and wrap its `do_fetch`
//! in [`with_resilience`] inside the `Source::fetch` impl.

pub mod csv_file;
pub mod exec;
pub mod graphql;
pub mod json_file;
pub mod markdown;
pub mod pg;
pub mod rest;
pub mod sqlite;

use std::future::Future;

use pulsearc_common::resilience::{CircuitBreaker, RetryError};
use pulsearc_common::with_retry;
use pulsearc_domain::{Row, RetrySpec, SourceError};
use tokio_util::sync::CancellationToken;

/// Wraps a single fetch attempt in retry-with-backoff, itself guarded by
/// a circuit breaker, the composition every adapter's `fetch` delegates
/// to after its own config/connection setup.
pub async fn with_resilience<F, Fut>(
    breaker: &CircuitBreaker,
    retry_spec: &RetrySpec,
    cancel: &CancellationToken,
    source_name: &str,
    op: F,
) -> Result<Vec<Row>, SourceError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Vec<Row>, SourceError>>,
{
    let retry_cfg = pulsearc_common::RetryConfig {
        max_retries: retry_spec.max_retries,
        base_delay: retry_spec.base_delay,
        max_delay: retry_spec.max_delay,
        multiplier: 2.0,
    };
    let result = breaker
        .execute(
            || async {
                with_retry(cancel, &retry_cfg, pulsearc_common::ErrorClassification::is_retryable, &op)
                    .await
                    .map_err(|err| retry_error_to_source(err, source_name))
            },
            pulsearc_common::ErrorClassification::is_retryable,
        )
        .await;
    result.map_err(|err| match err {
        pulsearc_common::ResilienceError::CircuitOpen => SourceError::CircuitOpen { source: source_name.to_string() },
        pulsearc_common::ResilienceError::OperationFailed { source } => source,
    })
}

fn retry_error_to_source(err: RetryError<SourceError>, source_name: &str) -> SourceError {
    match err {
        RetryError::NonRetryable { source } => source.into_non_retryable(),
        RetryError::AttemptsExhausted { source, .. } => source.into_non_retryable(),
        RetryError::Cancelled => SourceError::Source {
            source: source_name.to_string(),
            operation: "fetch".to_string(),
            wrapped: "cancelled".to_string(),
            retryable: false,
        },
        RetryError::InvalidConfiguration { message } => SourceError::Validation {
            source: source_name.to_string(),
            field: "retry".to_string(),
            reason: message,
        },
    }
}

/// Expands `${VAR}` references in `template` using the process
/// environment, leaving unresolved references untouched.
pub fn expand_env(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '$' && template[i + 1..].starts_with('{') {
            if let Some(end) = template[i + 2..].find('}') {
                let var = &template[i + 2..i + 2 + end];
                if let Ok(value) = std::env::var(var) {
                    out.push_str(&value);
                } else {
                    out.push_str(&template[i..i + 3 + end]);
                }
                for _ in 0..(end + 2) {
                    chars.next();
                }
                continue;
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_var() {
        std::env::set_var("PULSEARC_TEST_TOKEN", "secret123");
        assert_eq!(expand_env("Bearer ${PULSEARC_TEST_TOKEN}"), "Bearer secret123");
        std::env::remove_var("PULSEARC_TEST_TOKEN");
    }

    #[test]
    fn leaves_unresolved_var_untouched() {
        assert_eq!(expand_env("${DOES_NOT_EXIST_XYZ}"), "${DOES_NOT_EXIST_XYZ}");
    }
}
