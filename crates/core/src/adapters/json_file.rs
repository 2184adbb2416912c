//! `json`: a local JSON file, resolved relative to the site root.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pulsearc_domain::{Row, SourceConfig, SourceError, SourceKind};
use tokio_util::sync::CancellationToken;

use crate::adapters::exec::parse_json_shapes;
use crate::source::Source;

/// Reads `file` (relative to the site root) and parses it with the same
/// three-shape fallback as `exec`'s JSON format: array-of-objects, a
/// single object, or NDJSON.
pub struct JsonFileSource {
    name: String,
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(config: &SourceConfig, site_dir: &Path) -> Result<Self, SourceError> {
        let SourceKind::Json { file } = &config.kind else {
            return Err(validation_err(&config.name, "type", "expected a json descriptor"));
        };
        if file.trim().is_empty() {
            return Err(validation_err(&config.name, "file", "must not be empty"));
        }
        Ok(Self { name: config.name.clone(), path: site_dir.join(file) })
    }

    async fn do_fetch(&self) -> Result<Vec<Row>, SourceError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|err| SourceError::Source {
            source: self.name.clone(),
            operation: "read".to_string(),
            wrapped: format!("{}: {err}", self.path.display()),
            retryable: false,
        })?;
        parse_json_shapes(&self.name, &content)
    }
}

fn validation_err(source: &str, field: &str, reason: &str) -> SourceError {
    SourceError::Validation { source: source.to_string(), field: field.to_string(), reason: reason.to_string() }
}

#[async_trait]
impl Source for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, _cancel: &CancellationToken) -> Result<Vec<Row>, SourceError> {
        self.do_fetch().await
    }

    async fn close(&self) -> Result<(), SourceError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(file: &str) -> SourceConfig {
        SourceConfig {
            name: "data".to_string(),
            kind: SourceKind::Json { file: file.to_string() },
            cache: Default::default(),
            retry: Default::default(),
            timeout: None,
        }
    }

    #[tokio::test]
    async fn reads_and_parses_array_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.json"), r#"[{"id":1},{"id":2}]"#).unwrap();
        let adapter = JsonFileSource::new(&config("data.json"), dir.path()).unwrap();
        let rows = adapter.fetch(&CancellationToken::new()).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn missing_file_is_non_retryable_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = JsonFileSource::new(&config("missing.json"), dir.path()).unwrap();
        let err = adapter.fetch(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, SourceError::Source { retryable: false, .. }));
    }
}
