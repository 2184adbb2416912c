//! Source descriptors decoded from a site's configuration document.
//!
//! The document itself (TOML, JSON, whatever a site author writes) is
//! never parsed here; callers hand this crate an already-decoded
//! [`SourceConfig`]. These types only own the shape of a decoded
//! descriptor and the duration-string conversion into [`std::time::Duration`].

use std::collections::HashMap;
use std::time::Duration;

use pulsearc_common::parse_duration;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_EXEC_TIMEOUT, DEFAULT_FETCH_TIMEOUT, DEFAULT_SQLITE_PATH};

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw).map_err(serde::de::Error::custom)
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| parse_duration(&s).map_err(serde::de::Error::custom)).transpose()
}

/// Cache strategy requested by a source descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheStrategy {
    Simple,
    StaleWhileRevalidate,
}

impl Default for CacheStrategy {
    fn default() -> Self {
        CacheStrategy::Simple
    }
}

/// `cache` block of a source descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSpec {
    #[serde(deserialize_with = "deserialize_duration")]
    pub ttl: Duration,
    pub strategy: CacheStrategy,
    pub max_rows: usize,
    pub max_bytes: usize,
}

impl Default for CacheSpec {
    fn default() -> Self {
        Self {
            ttl: Duration::ZERO,
            strategy: CacheStrategy::Simple,
            max_rows: 0,
            max_bytes: 0,
        }
    }
}

impl CacheSpec {
    /// Caching is disabled when `ttl` is zero.
    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }
}

/// `retry` block of a source descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySpec {
    pub max_retries: u32,
    #[serde(deserialize_with = "deserialize_duration")]
    pub base_delay: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub max_delay: Duration,
}

impl Default for RetrySpec {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Output shape an `exec` adapter should parse its stdout as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecFormat {
    Json,
    Lines,
    Csv,
}

/// HTTP method for a `rest` descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Default for HttpMethod {
    fn default() -> Self {
        HttpMethod::Get
    }
}

/// Kind-specific fields of a source descriptor, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceKind {
    Exec {
        cmd: String,
        #[serde(default)]
        format: Option<ExecFormat>,
        #[serde(default)]
        delimiter: Option<char>,
        #[serde(default)]
        env: HashMap<String, String>,
        #[serde(default, deserialize_with = "deserialize_duration_opt")]
        timeout: Option<Duration>,
        #[serde(default)]
        manual: bool,
    },
    Pg {
        query: String,
        #[serde(default)]
        dsn: Option<String>,
        #[serde(default)]
        options: HashMap<String, String>,
    },
    Rest {
        url: String,
        #[serde(default)]
        method: HttpMethod,
        #[serde(default)]
        headers: HashMap<String, String>,
        #[serde(default)]
        auth_header: Option<String>,
        #[serde(default)]
        api_key: Option<String>,
    },
    Graphql {
        url: String,
        query_file: String,
        result_path: String,
        #[serde(default)]
        variables: HashMap<String, serde_json::Value>,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
    Json {
        file: String,
    },
    Csv {
        file: String,
        #[serde(default = "default_true")]
        header: bool,
    },
    Sqlite {
        table: String,
        #[serde(default = "default_sqlite_path")]
        db: String,
        #[serde(default)]
        readonly: bool,
    },
    Markdown {
        file: String,
        anchor: String,
        #[serde(default = "default_true")]
        readonly: bool,
    },
}

fn default_true() -> bool {
    true
}

fn default_sqlite_path() -> String {
    DEFAULT_SQLITE_PATH.to_string()
}

/// A fully decoded source descriptor: its unique name plus the
/// kind-specific fields and the three cross-cutting blocks every kind
/// may carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(flatten)]
    pub kind: SourceKind,
    #[serde(default)]
    pub cache: CacheSpec,
    #[serde(default)]
    pub retry: RetrySpec,
    #[serde(default, deserialize_with = "deserialize_duration_opt")]
    pub timeout: Option<Duration>,
}

impl SourceConfig {
    /// The timeout this descriptor requests, falling back to the
    /// adapter-family default when the descriptor omits one.
    pub fn effective_timeout(&self) -> Duration {
        self.timeout.unwrap_or_else(|| match &self.kind {
            SourceKind::Exec { .. } => DEFAULT_EXEC_TIMEOUT,
            _ => DEFAULT_FETCH_TIMEOUT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_exec_descriptor_with_duration_strings() {
        let json = serde_json::json!({
            "name": "todos",
            "type": "exec",
            "cmd": "echo hi",
            "timeout": "5s",
            "cache": { "ttl": "200ms", "strategy": "stale-while-revalidate" },
        });
        let cfg: SourceConfig = serde_json::from_value(json).unwrap();
        assert_eq!(cfg.name, "todos");
        assert_eq!(cfg.timeout, Some(Duration::from_secs(5)));
        assert_eq!(cfg.cache.ttl, Duration::from_millis(200));
        assert_eq!(cfg.cache.strategy, CacheStrategy::StaleWhileRevalidate);
        assert!(matches!(cfg.kind, SourceKind::Exec { .. }));
    }

    #[test]
    fn cache_disabled_by_default() {
        let cfg = CacheSpec::default();
        assert!(!cfg.is_enabled());
    }

    #[test]
    fn retry_defaults_match_engine_defaults() {
        let retry = RetrySpec::default();
        assert_eq!(retry.max_retries, 3);
        assert_eq!(retry.base_delay, Duration::from_millis(100));
        assert_eq!(retry.max_delay, Duration::from_secs(5));
    }

    #[test]
    fn sqlite_descriptor_defaults_db_path() {
        let json = serde_json::json!({ "name": "notes", "type": "sqlite", "table": "notes" });
        let cfg: SourceConfig = serde_json::from_value(json).unwrap();
        match cfg.kind {
            SourceKind::Sqlite { db, readonly, .. } => {
                assert_eq!(db, DEFAULT_SQLITE_PATH);
                assert!(!readonly);
            }
            _ => panic!("expected sqlite kind"),
        }
    }
}
