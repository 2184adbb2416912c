//! `pg`: a pooled Postgres query source.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use pulsearc_common::resilience::{CircuitBreaker, CircuitBreakerConfig};
use pulsearc_domain::{Row, RetrySpec, SourceConfig, SourceError, SourceKind};
use serde_json::Value;
use tokio_postgres::types::Type;
use tokio_postgres::{Config as PgConfig, NoTls};
use tokio_util::sync::CancellationToken;

use crate::adapters::with_resilience;
use crate::source::Source;

/// `pg` pools have no separate idle/lifetime knobs the way an r2d2 pool
/// does; `deadpool` caps only total concurrent checkouts, which this
/// adapter sizes the same as the spec's documented `max_open`.
const MAX_POOL_SIZE: usize = 5;

/// Queries a fixed SQL statement against a pooled Postgres connection,
/// sized at `max_size=5` with a 5-second construction-time ping and the
/// descriptor's own timeout applied to every subsequent query.
pub struct PgSource {
    name: String,
    query: String,
    pool: Pool,
    timeout: Duration,
    retry: RetrySpec,
    breaker: CircuitBreaker,
}

impl PgSource {
    pub async fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let SourceKind::Pg { query, dsn, .. } = &config.kind else {
            return Err(validation_err(&config.name, "type", "expected a pg descriptor"));
        };
        let dsn = dsn
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .ok_or_else(|| validation_err(&config.name, "dsn", "no dsn given and DATABASE_URL is unset"))?;

        let pg_config = PgConfig::from_str(&dsn).map_err(|err| {
            validation_err(&config.name, "dsn", &err.to_string())
        })?;
        let manager = Manager::from_config(pg_config, NoTls, ManagerConfig { recycling_method: RecyclingMethod::Fast });
        let pool = Pool::builder(manager).max_size(MAX_POOL_SIZE).build().map_err(|err| SourceError::Connection {
            source: config.name.clone(),
            address: "postgres".to_string(),
            wrapped: err.to_string(),
        })?;

        let ping = pool.get();
        tokio::time::timeout(std::time::Duration::from_secs(5), ping)
            .await
            .map_err(|_| SourceError::Timeout {
                source: config.name.clone(),
                operation: "connect".to_string(),
                duration_ms: 5000,
            })?
            .map_err(|err| SourceError::Connection {
                source: config.name.clone(),
                address: "postgres".to_string(),
                wrapped: err.to_string(),
            })?;

        Ok(Self {
            name: config.name.clone(),
            query: query.clone(),
            pool,
            timeout: config.effective_timeout(),
            retry: config.retry.clone(),
            breaker: CircuitBreaker::named(config.name.clone(), CircuitBreakerConfig::default()),
        })
    }

    async fn do_fetch(&self) -> Result<Vec<Row>, SourceError> {
        let client = self.pool.get().await.map_err(|err| SourceError::Connection {
            source: self.name.clone(),
            address: "postgres".to_string(),
            wrapped: err.to_string(),
        })?;
        let rows = tokio::time::timeout(self.timeout, client.query(self.query.as_str(), &[]))
            .await
            .map_err(|_| SourceError::Timeout {
                source: self.name.clone(),
                operation: "query".to_string(),
                duration_ms: self.timeout.as_millis() as u64,
            })?
            .map_err(|err| SourceError::Source {
                source: self.name.clone(),
                operation: "query".to_string(),
                wrapped: err.to_string(),
                retryable: true,
            })?;

        Ok(rows.iter().map(row_from_pg).collect())
    }
}

fn row_from_pg(row: &tokio_postgres::Row) -> Row {
    let mut out = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        let value = match *column.type_() {
            Type::BOOL => row.get::<_, Option<bool>>(index).map(Value::from),
            Type::INT2 => row.get::<_, Option<i16>>(index).map(|v| Value::from(v as i64)),
            Type::INT4 => row.get::<_, Option<i32>>(index).map(|v| Value::from(v as i64)),
            Type::INT8 => row.get::<_, Option<i64>>(index).map(Value::from),
            Type::FLOAT4 => row.get::<_, Option<f32>>(index).map(|v| Value::from(v as f64)),
            Type::FLOAT8 => row.get::<_, Option<f64>>(index).map(Value::from),
            Type::BYTEA => row.get::<_, Option<Vec<u8>>>(index).map(|bytes| Value::from(String::from_utf8_lossy(&bytes).to_string())),
            _ => row.get::<_, Option<String>>(index).map(Value::from),
        }
        .unwrap_or(Value::Null);
        out.insert(column.name().to_string(), value);
    }
    out
}

fn validation_err(source: &str, field: &str, reason: &str) -> SourceError {
    SourceError::Validation { source: source.to_string(), field: field.to_string(), reason: reason.to_string() }
}

#[async_trait]
impl Source for PgSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, cancel: &CancellationToken) -> Result<Vec<Row>, SourceError> {
        with_resilience(&self.breaker, &self.retry, cancel, &self.name, || self.do_fetch()).await
    }

    async fn close(&self) -> Result<(), SourceError> {
        self.pool.close();
        Ok(())
    }
}
