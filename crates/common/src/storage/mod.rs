//! Pooled SQLite access.
//!
//! A thin wrapper around `r2d2` + `r2d2_sqlite`, sized and configured the
//! way the sqlite source adapter needs it: a handful of connections, WAL
//! mode for concurrent readers, and a single pool per database file shared
//! by every sqlite-backed source in a site.

use std::path::{Path, PathBuf};
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to open sqlite pool at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: r2d2::Error,
    },
    #[error("failed to checkout sqlite connection: {0}")]
    Checkout(#[from] r2d2::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Clone)]
pub struct SqlitePoolConfig {
    pub max_size: u32,
    pub connection_timeout: Duration,
}

impl Default for SqlitePoolConfig {
    fn default() -> Self {
        Self { max_size: 5, connection_timeout: Duration::from_secs(5) }
    }
}

/// A connection pool to a single SQLite database file.
#[derive(Clone)]
pub struct SqlitePool {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
}

impl SqlitePool {
    #[instrument(skip(config), fields(db_path = ?path.as_ref(), pool_size = config.max_size))]
    pub fn open(path: impl AsRef<Path>, config: SqlitePoolConfig) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let manager = SqliteConnectionManager::file(&path).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;",
            )
        });
        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|source| StorageError::Open { path: path.clone(), source })?;
        Ok(Self { pool, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> StorageResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }
}
