//! `csv`: a local delimited file, resolved relative to the site root.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pulsearc_domain::{Row, SourceConfig, SourceError, SourceKind};
use tokio_util::sync::CancellationToken;

use crate::adapters::exec::parse_csv_str;
use crate::source::Source;

/// Reads `file` (relative to the site root) as CSV. When `header` is
/// `false`, columns are synthesized as `col1, col2, ...` in file order.
pub struct CsvFileSource {
    name: String,
    path: PathBuf,
    header: bool,
}

impl CsvFileSource {
    pub fn new(config: &SourceConfig, site_dir: &Path) -> Result<Self, SourceError> {
        let SourceKind::Csv { file, header } = &config.kind else {
            return Err(validation_err(&config.name, "type", "expected a csv descriptor"));
        };
        if file.trim().is_empty() {
            return Err(validation_err(&config.name, "file", "must not be empty"));
        }
        Ok(Self { name: config.name.clone(), path: site_dir.join(file), header: *header })
    }

    async fn do_fetch(&self) -> Result<Vec<Row>, SourceError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|err| SourceError::Source {
            source: self.name.clone(),
            operation: "read".to_string(),
            wrapped: format!("{}: {err}", self.path.display()),
            retryable: false,
        })?;
        parse_csv_str(&self.name, &content, b',', self.header)
    }
}

fn validation_err(source: &str, field: &str, reason: &str) -> SourceError {
    SourceError::Validation { source: source.to_string(), field: field.to_string(), reason: reason.to_string() }
}

#[async_trait]
impl Source for CsvFileSource {
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
    use serde_json::Value;

    use super::*;

    fn config(file: &str, header: bool) -> SourceConfig {
        SourceConfig {
            name: "rows".to_string(),
            kind: SourceKind::Csv { file: file.to_string(), header },
            cache: Default::default(),
            retry: Default::default(),
            timeout: None,
        }
    }

    #[tokio::test]
    async fn reads_headered_csv() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("rows.csv"), "a,b\n1,2\n3,4\n").unwrap();
        let adapter = CsvFileSource::new(&config("rows.csv", true), dir.path()).unwrap();
        let rows = adapter.fetch(&CancellationToken::new()).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("a"), Some(&Value::from("1")));
    }

    #[tokio::test]
    async fn synthesizes_column_names_without_header() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("rows.csv"), "1,2\n3,4\n").unwrap();
        let adapter = CsvFileSource::new(&config("rows.csv", false), dir.path()).unwrap();
        let rows = adapter.fetch(&CancellationToken::new()).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("col1"), Some(&Value::from("1")));
        assert_eq!(rows[0].get("col2"), Some(&Value::from("2")));
    }
}
