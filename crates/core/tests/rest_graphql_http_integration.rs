//! Integration tests for the `rest` and `graphql` adapters against a real
//! HTTP server (WireMock), exercising status-code classification, header
//! propagation, and timeout behavior end to end rather than just the pure
//! JSON-shape parsing helpers.

use std::collections::HashMap;
use std::time::Duration;

use pulsearc_core::Source;
use pulsearc_core::adapters::graphql::GraphqlSource;
use pulsearc_core::adapters::rest::RestSource;
use pulsearc_domain::config::HttpMethod;
use pulsearc_domain::{SourceConfig, SourceError, SourceKind};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rest_config(name: &str, url: String) -> SourceConfig {
    SourceConfig {
        name: name.to_string(),
        kind: SourceKind::Rest {
            url,
            method: HttpMethod::Get,
            headers: HashMap::new(),
            auth_header: None,
            api_key: None,
        },
        cache: Default::default(),
        retry: Default::default(),
        timeout: Some(Duration::from_millis(200)),
    }
}

#[tokio::test]
async fn rest_adapter_unwraps_data_field_over_real_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"id": 1}, {"id": 2}],
        })))
        .mount(&server)
        .await;

    let config = rest_config("items", format!("{}/items", server.uri()));
    let adapter = RestSource::new(&config).unwrap();
    let rows = adapter.fetch(&CancellationToken::new()).await.unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn rest_adapter_sends_auth_header_and_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/secure"))
        .and(header("Authorization", "Bearer tok"))
        .and(header("X-Api-Key", "key123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{"ok": true}])))
        .mount(&server)
        .await;

    let config = SourceConfig {
        name: "secure".to_string(),
        kind: SourceKind::Rest {
            url: format!("{}/secure", server.uri()),
            method: HttpMethod::Get,
            headers: HashMap::new(),
            auth_header: Some("Bearer tok".to_string()),
            api_key: Some("key123".to_string()),
        },
        cache: Default::default(),
        retry: Default::default(),
        timeout: None,
    };
    let adapter = RestSource::new(&config).unwrap();
    let rows = adapter.fetch(&CancellationToken::new()).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn rest_adapter_surfaces_5xx_as_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down for maintenance"))
        .mount(&server)
        .await;

    let config = SourceConfig {
        name: "broken".to_string(),
        kind: SourceKind::Rest {
            url: format!("{}/broken", server.uri()),
            method: HttpMethod::Get,
            headers: HashMap::new(),
            auth_header: None,
            api_key: None,
        },
        cache: Default::default(),
        retry: Default::default(),
        timeout: Some(Duration::from_millis(200)),
    };
    let adapter = RestSource::new(&config).unwrap();
    let err = adapter.fetch(&CancellationToken::new()).await.unwrap_err();
    match err {
        SourceError::Http { status, .. } => assert_eq!(status, 503),
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn rest_adapter_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let config = SourceConfig {
        name: "slow".to_string(),
        kind: SourceKind::Rest {
            url: format!("{}/slow", server.uri()),
            method: HttpMethod::Get,
            headers: HashMap::new(),
            auth_header: None,
            api_key: None,
        },
        cache: Default::default(),
        retry: crate_retry_no_backoff(),
        timeout: Some(Duration::from_millis(50)),
    };
    let adapter = RestSource::new(&config).unwrap();
    let err = adapter.fetch(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, SourceError::Timeout { .. } | SourceError::Connection { .. }));
}

#[tokio::test]
async fn graphql_adapter_extracts_rows_via_result_path_over_real_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "issues": [{"id": 1}, {"id": 2}] }
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("query.graphql"), "query { issues { id } }").unwrap();

    let config = SourceConfig {
        name: "issues".to_string(),
        kind: SourceKind::Graphql {
            url: format!("{}/graphql", server.uri()),
            query_file: "query.graphql".to_string(),
            result_path: "data.issues".to_string(),
            variables: HashMap::new(),
            headers: HashMap::new(),
        },
        cache: Default::default(),
        retry: Default::default(),
        timeout: None,
    };
    let adapter = GraphqlSource::new(&config, dir.path()).unwrap();
    let rows = adapter.fetch(&CancellationToken::new()).await.unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn graphql_adapter_surfaces_first_error_over_real_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errors": [{"message": "field not found"}],
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("query.graphql"), "query { issues { id } }").unwrap();

    let config = SourceConfig {
        name: "issues".to_string(),
        kind: SourceKind::Graphql {
            url: format!("{}/graphql", server.uri()),
            query_file: "query.graphql".to_string(),
            result_path: "data.issues".to_string(),
            variables: HashMap::new(),
            headers: HashMap::new(),
        },
        cache: Default::default(),
        retry: Default::default(),
        timeout: None,
    };
    let adapter = GraphqlSource::new(&config, dir.path()).unwrap();
    let err = adapter.fetch(&CancellationToken::new()).await.unwrap_err();
    match err {
        SourceError::GraphQl { message, .. } => assert_eq!(message, "field not found"),
        other => panic!("expected GraphQl error, got {other:?}"),
    }
}

fn crate_retry_no_backoff() -> pulsearc_domain::RetrySpec {
    pulsearc_domain::RetrySpec { max_retries: 0, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(1) }
}
