//! `graphql`: POST a query file's contents and extract rows via a dot-path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pulsearc_common::resilience::{CircuitBreaker, CircuitBreakerConfig};
use pulsearc_domain::constants::MAX_RESPONSE_BYTES;
use pulsearc_domain::{row_from_pairs, Row, RetrySpec, SourceConfig, SourceError, SourceKind};
use reqwest::Client;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::adapters::{expand_env, with_resilience};
use crate::source::Source;

/// Posts `{query, variables}` to a GraphQL endpoint and pulls rows out of
/// the response via a dot-path into `data`.
pub struct GraphqlSource {
    name: String,
    client: Client,
    url: String,
    query: String,
    variables: HashMap<String, Value>,
    headers: Vec<(String, String)>,
    result_path: String,
    retry: RetrySpec,
    breaker: CircuitBreaker,
}

impl GraphqlSource {
    pub fn new(config: &SourceConfig, site_dir: &Path) -> Result<Self, SourceError> {
        let SourceKind::Graphql { url, query_file, result_path, variables, headers } = &config.kind else {
            return Err(validation_err(&config.name, "type", "expected a graphql descriptor"));
        };
        let query_path: PathBuf = site_dir.join(query_file);
        let query = std::fs::read_to_string(&query_path).map_err(|err| {
            validation_err(&config.name, "query_file", &format!("{}: {err}", query_path.display()))
        })?;

        let client = Client::builder().timeout(config.effective_timeout()).build().map_err(|err| {
            SourceError::Source {
                source: config.name.clone(),
                operation: "build client".to_string(),
                wrapped: err.to_string(),
                retryable: false,
            }
        })?;

        Ok(Self {
            name: config.name.clone(),
            client,
            url: expand_env(url),
            query,
            variables: variables.clone(),
            headers: headers.iter().map(|(k, v)| (k.clone(), expand_env(v))).collect(),
            result_path: result_path.clone(),
            retry: config.retry.clone(),
            breaker: CircuitBreaker::named(config.name.clone(), CircuitBreakerConfig::default()),
        })
    }

    async fn do_fetch(&self) -> Result<Vec<Row>, SourceError> {
        let body = serde_json::json!({ "query": self.query, "variables": self.variables });
        let mut request = self.client.post(&self.url).json(&body);
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                SourceError::Timeout { source: self.name.clone(), operation: "request".to_string(), duration_ms: 30_000 }
            } else {
                SourceError::Connection { source: self.name.clone(), address: self.url.clone(), wrapped: err.to_string() }
            }
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|err| SourceError::Source {
            source: self.name.clone(),
            operation: "read body".to_string(),
            wrapped: err.to_string(),
            retryable: true,
        })?;
        if bytes.len() > MAX_RESPONSE_BYTES {
            return Err(SourceError::Validation {
                source: self.name.clone(),
                field: "response".to_string(),
                reason: format!("response body exceeds {MAX_RESPONSE_BYTES} bytes"),
            });
        }
        if !status.is_success() {
            let truncated: String = String::from_utf8_lossy(&bytes).chars().take(1024).collect();
            return Err(SourceError::Http { source: self.name.clone(), status: status.as_u16(), body: truncated });
        }

        let envelope: Value = serde_json::from_slice(&bytes).map_err(|err| SourceError::Validation {
            source: self.name.clone(),
            field: "response".to_string(),
            reason: err.to_string(),
        })?;

        extract_graphql_rows(&self.name, &envelope, &self.result_path)
    }
}

/// Surfaces the first entry of a GraphQL `errors` array, if present.
/// Matches the original implementation's behaviour of collapsing a
/// multi-error response down to one reported error.
fn first_error(name: &str, envelope: &Value) -> Option<SourceError> {
    let errors = envelope.get("errors")?.as_array()?;
    let first = errors.first()?;
    let message = first.get("message").and_then(Value::as_str).unwrap_or("unknown GraphQL error").to_string();
    let path = first.get("path").map(|p| p.to_string());
    Some(SourceError::GraphQl { source: name.to_string(), message, path })
}

/// Resolves `result_path` (dot-separated keys, e.g. `data.repository.issues`)
/// against `envelope` and maps the resolved array into rows, skipping and
/// logging any element that is not itself a JSON object.
pub fn extract_graphql_rows(name: &str, envelope: &Value, result_path: &str) -> Result<Vec<Row>, SourceError> {
    if let Some(err) = first_error(name, envelope) {
        return Err(err);
    }

    let mut node = envelope;
    for segment in result_path.split('.') {
        node = node.get(segment).ok_or_else(|| SourceError::Validation {
            source: name.to_string(),
            field: "result_path".to_string(),
            reason: format!("no `{segment}` field in response at this point in `{result_path}`"),
        })?;
    }

    let items = node.as_array().ok_or_else(|| SourceError::Validation {
        source: name.to_string(),
        field: "result_path".to_string(),
        reason: format!("`{result_path}` did not resolve to an array"),
    })?;

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(map) => rows.push(row_from_pairs(map.clone())),
            other => warn!(source = name, ?other, "skipping non-object element under result_path"),
        }
    }
    Ok(rows)
}

fn validation_err(source: &str, field: &str, reason: &str) -> SourceError {
    SourceError::Validation { source: source.to_string(), field: field.to_string(), reason: reason.to_string() }
}

#[async_trait]
impl Source for GraphqlSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, cancel: &CancellationToken) -> Result<Vec<Row>, SourceError> {
        with_resilience(&self.breaker, &self.retry, cancel, &self.name, || self.do_fetch()).await
    }

    async fn close(&self) -> Result<(), SourceError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn extracts_rows_via_dot_path() {
        let envelope = json!({ "data": { "repository": { "issues": [{"id": 1}, {"id": 2}] } } });
        let rows = extract_graphql_rows("s", &envelope, "data.repository.issues").unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn non_object_elements_are_skipped() {
        let envelope = json!({ "data": { "issues": [{"id": 1}, 2, "three"] } });
        let rows = extract_graphql_rows("s", &envelope, "data.issues").unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn first_error_is_surfaced_rest_are_collapsed() {
        let envelope = json!({ "errors": [{"message": "first"}, {"message": "second"}] });
        let err = extract_graphql_rows("s", &envelope, "data.issues").unwrap_err();
        match err {
            SourceError::GraphQl { message, .. } => assert_eq!(message, "first"),
            other => panic!("expected GraphQl error, got {other:?}"),
        }
    }

    #[test]
    fn missing_path_segment_is_validation_error() {
        let envelope = json!({ "data": {} });
        let err = extract_graphql_rows("s", &envelope, "data.issues").unwrap_err();
        assert!(matches!(err, SourceError::Validation { .. }));
    }

    #[test]
    fn non_array_result_is_validation_error() {
        let envelope = json!({ "data": { "issues": "not-an-array" } });
        let err = extract_graphql_rows("s", &envelope, "data.issues").unwrap_err();
        assert!(matches!(err, SourceError::Validation { .. }));
    }
}
