//! `exec`: run a configured command and parse its stdout.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use pulsearc_common::resilience::{CircuitBreaker, CircuitBreakerConfig};
use pulsearc_domain::config::ExecFormat;
use pulsearc_domain::{row_from_pairs, Row, RetrySpec, SourceConfig, SourceError, SourceKind};
use serde_json::Value;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::adapters::with_resilience;
use crate::source::Source;

/// Runs `cmd` (split on whitespace) in `work_dir` and parses its stdout
/// according to `format`.
pub struct ExecSource {
    name: String,
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    work_dir: PathBuf,
    format: ExecFormat,
    delimiter: u8,
    timeout: std::time::Duration,
    retry: RetrySpec,
    breaker: CircuitBreaker,
}

impl ExecSource {
    pub fn new(config: &SourceConfig, site_dir: &Path) -> Result<Self, SourceError> {
        let SourceKind::Exec { cmd, format, delimiter, env, timeout, .. } = &config.kind else {
            return Err(validation_err(&config.name, "type", "expected an exec descriptor"));
        };
        let mut parts = cmd.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| validation_err(&config.name, "cmd", "must not be empty"))?
            .to_string();
        let args = parts.map(str::to_string).collect();

        Ok(Self {
            name: config.name.clone(),
            program,
            args,
            env: env.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            work_dir: site_dir.to_path_buf(),
            format: format.unwrap_or(ExecFormat::Json),
            delimiter: delimiter.map(|c| c as u8).unwrap_or(b','),
            timeout: timeout.unwrap_or(pulsearc_domain::constants::DEFAULT_EXEC_TIMEOUT),
            retry: config.retry.clone(),
            breaker: CircuitBreaker::named(config.name.clone(), CircuitBreakerConfig::default()),
        })
    }

    async fn do_fetch(&self) -> Result<Vec<Row>, SourceError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(&self.work_dir)
            .envs(self.env.iter().cloned())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| SourceError::Timeout {
                source: self.name.clone(),
                operation: "exec".to_string(),
                duration_ms: self.timeout.as_millis() as u64,
            })?
            .map_err(|err| SourceError::Source {
                source: self.name.clone(),
                operation: "spawn".to_string(),
                wrapped: err.to_string(),
                retryable: false,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(SourceError::Source {
                source: self.name.clone(),
                operation: "exec".to_string(),
                wrapped: stderr,
                retryable: false,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        parse_output(&self.name, &stdout, self.format, self.delimiter)
    }
}

fn parse_output(name: &str, stdout: &str, format: ExecFormat, delimiter: u8) -> Result<Vec<Row>, SourceError> {
    match format {
        ExecFormat::Json => parse_json_shapes(name, stdout),
        ExecFormat::Lines => Ok(stdout
            .lines()
            .filter(|l| !l.trim().is_empty())
            .enumerate()
            .map(|(index, line)| row_from_pairs([("line", Value::from(line)), ("index", Value::from(index))]))
            .collect()),
        ExecFormat::Csv => parse_csv_str(name, stdout, delimiter, true),
    }
}

/// Shared three-shape JSON fallback used by `exec`, `json` (inline or
/// file-backed), and `rest`-adjacent callers that hand us a whole
/// response body to interpret as rows: array-of-objects, a single
/// object, or NDJSON (one object per non-blank line).
pub fn parse_json_shapes(name: &str, text: &str) -> Result<Vec<Row>, SourceError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) {
        return items.into_iter().map(|v| value_to_row(name, v)).collect();
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(vec![map.into_iter().collect()]);
    }
    let mut rows = Vec::new();
    for line in trimmed.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(|err| {
            SourceError::Validation { source: name.to_string(), field: "stdout".to_string(), reason: err.to_string() }
        })?;
        rows.push(value_to_row(name, value)?);
    }
    Ok(rows)
}

fn value_to_row(name: &str, value: Value) -> Result<Row, SourceError> {
    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(SourceError::Validation {
            source: name.to_string(),
            field: "stdout".to_string(),
            reason: format!("expected a JSON object, got {other}"),
        }),
    }
}

/// Parses `text` as delimited records, mapping each to `{header -> cell}`.
pub fn parse_csv_str(name: &str, text: &str, delimiter: u8, has_header: bool) -> Result<Vec<Row>, SourceError> {
    let mut reader = csv::ReaderBuilder::new().delimiter(delimiter).has_headers(has_header).from_reader(text.as_bytes());

    let headers: Vec<String> = if has_header {
        reader
            .headers()
            .map_err(|err| csv_err(name, err))?
            .iter()
            .map(str::to_string)
            .collect()
    } else {
        let width = reader.headers().map_err(|err| csv_err(name, err))?.len();
        (1..=width).map(|i| format!("col{i}")).collect()
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| csv_err(name, err))?;
        let row = headers.iter().cloned().zip(record.iter().map(Value::from)).collect();
        rows.push(row);
    }
    Ok(rows)
}

fn csv_err(name: &str, err: csv::Error) -> SourceError {
    SourceError::Validation { source: name.to_string(), field: "file".to_string(), reason: err.to_string() }
}

fn validation_err(source: &str, field: &str, reason: &str) -> SourceError {
    SourceError::Validation { source: source.to_string(), field: field.to_string(), reason: reason.to_string() }
}

#[async_trait]
impl Source for ExecSource {
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
