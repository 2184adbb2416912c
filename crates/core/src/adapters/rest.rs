//! `rest`: a GET/POST/... JSON endpoint.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use pulsearc_common::resilience::{CircuitBreaker, CircuitBreakerConfig};
use pulsearc_domain::config::HttpMethod;
use pulsearc_domain::constants::{MAX_HTTP_ERROR_BODY, MAX_RESPONSE_BYTES};
use pulsearc_domain::{row_from_pairs, Row, RetrySpec, SourceConfig, SourceError, SourceKind};
use reqwest::{Client, Method};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::adapters::{expand_env, with_resilience};
use crate::source::Source;

/// Queries a JSON REST endpoint. Holds a single reused [`Client`] between
/// fetches; the URL, headers, and auth fields are resolved once at
/// construction with `${VAR}` env expansion applied.
pub struct RestSource {
    name: String,
    client: Client,
    url: String,
    method: Method,
    headers: Vec<(String, String)>,
    retry: RetrySpec,
    breaker: CircuitBreaker,
}

impl RestSource {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let SourceKind::Rest { url, method, headers, auth_header, api_key } = &config.kind else {
            return Err(validation_err(&config.name, "type", "expected a rest descriptor"));
        };
        if url.trim().is_empty() {
            return Err(validation_err(&config.name, "url", "must not be empty"));
        }

        let mut resolved_headers: Vec<(String, String)> =
            headers.iter().map(|(k, v)| (k.clone(), expand_env(v))).collect();
        if let Some(auth) = auth_header {
            resolved_headers.push(("Authorization".to_string(), expand_env(auth)));
        }
        if let Some(key) = api_key {
            resolved_headers.push(("X-Api-Key".to_string(), expand_env(key)));
        }

        let client = Client::builder()
            .timeout(config.effective_timeout())
            .build()
            .map_err(|err| SourceError::Source {
                source: config.name.clone(),
                operation: "build client".to_string(),
                wrapped: err.to_string(),
                retryable: false,
            })?;

        Ok(Self {
            name: config.name.clone(),
            client,
            url: expand_env(url),
            method: to_reqwest_method(*method),
            headers: resolved_headers,
            retry: config.retry.clone(),
            breaker: CircuitBreaker::named(config.name.clone(), CircuitBreakerConfig::default()),
        })
    }

    async fn do_fetch(&self) -> Result<Vec<Row>, SourceError> {
        let mut request = self.client.request(self.method.clone(), &self.url);
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                SourceError::Timeout {
                    source: self.name.clone(),
                    operation: "request".to_string(),
                    duration_ms: Duration::from_secs(30).as_millis() as u64,
                }
            } else {
                SourceError::Connection {
                    source: self.name.clone(),
                    address: self.url.clone(),
                    wrapped: err.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let truncated: String = body.chars().take(MAX_HTTP_ERROR_BODY).collect();
            return Err(SourceError::Http { source: self.name.clone(), status: status.as_u16(), body: truncated });
        }

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

        parse_rest_json(&self.name, &bytes)
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Parses a REST response body. A top-level array is used as-is; a
/// top-level object is unwrapped through a `data` or `results` field if
/// either holds an array, otherwise the object itself becomes the sole
/// row.
///
/// Preserves an ambiguity from the original implementation verbatim: if
/// the `data`/`results` array contains only non-object elements, this
/// silently yields zero rows rather than surfacing an error — a
/// malformed payload can look identical to an empty one.
pub fn parse_rest_json(name: &str, bytes: &[u8]) -> Result<Vec<Row>, SourceError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_slice(bytes).map_err(|err| SourceError::Validation {
        source: name.to_string(),
        field: "response".to_string(),
        reason: err.to_string(),
    })?;

    match value {
        Value::Array(items) => Ok(items.into_iter().filter_map(Value::as_object_cloned).map(row_from_object).collect()),
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get("data") {
                return Ok(items.iter().filter_map(|v| v.as_object()).cloned().map(row_from_object).collect());
            }
            if let Some(Value::Array(items)) = map.get("results") {
                return Ok(items.iter().filter_map(|v| v.as_object()).cloned().map(row_from_object).collect());
            }
            Ok(vec![map.into_iter().collect()])
        }
        other => Err(SourceError::Validation {
            source: name.to_string(),
            field: "response".to_string(),
            reason: format!("expected a JSON object or array, got {other}"),
        }),
    }
}

fn row_from_object(map: serde_json::Map<String, Value>) -> Row {
    map.into_iter().collect()
}

trait AsObjectCloned {
    fn as_object_cloned(self) -> Option<serde_json::Map<String, Value>>;
}

impl AsObjectCloned for Value {
    fn as_object_cloned(self) -> Option<serde_json::Map<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }
}

fn validation_err(source: &str, field: &str, reason: &str) -> SourceError {
    SourceError::Validation { source: source.to_string(), field: field.to_string(), reason: reason.to_string() }
}

#[async_trait]
impl Source for RestSource {
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
    use super::*;

    #[test]
    fn parses_bare_array() {
        let rows = parse_rest_json("s", br#"[{"id":1},{"id":2}]"#).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn unwraps_data_field() {
        let rows = parse_rest_json("s", br#"{"count":2,"data":[{"id":1},{"id":2}]}"#).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("id"), Some(&Value::from(1)));
    }

    #[test]
    fn unwraps_results_field() {
        let rows = parse_rest_json("s", br#"{"results":[{"id":1}]}"#).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn bare_object_becomes_single_row() {
        let rows = parse_rest_json("s", br#"{"id":1,"name":"a"}"#).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn non_object_wrapper_elements_silently_yield_zero_rows() {
        let rows = parse_rest_json("s", br#"{"data":[1,2,3]}"#).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn empty_body_is_empty_rows() {
        let rows = parse_rest_json("s", b"   ").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn env_expansion_resolves_known_var() {
        std::env::set_var("PULSEARC_REST_TEST_TOKEN", "abc123");
        let expanded = expand_env("Bearer ${PULSEARC_REST_TEST_TOKEN}");
        assert_eq!(expanded, "Bearer abc123");
        std::env::remove_var("PULSEARC_REST_TEST_TOKEN");
    }
}
