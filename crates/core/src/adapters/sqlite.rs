//! `sqlite`: a table in a shared SQLite database file, readable and
//! (unless `readonly`) writable.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use pulsearc_common::storage::{SqlitePool, SqlitePoolConfig};
use pulsearc_domain::{Row, SourceConfig, SourceError, SourceKind, WriteAction, WriteError};
use regex::Regex;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, ToSql};
use serde_json::Value;
use tokio::task;
use tokio_util::sync::CancellationToken;

use crate::source::{Source, WritableSource};

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}$").unwrap());

/// Reads and writes rows of a single table in a shared SQLite database
/// file. Schema is discovered at construction; if the table does not yet
/// exist, the first `add` infers a schema from the submitted fields and
/// creates it. One mutex serializes schema discovery/creation and writes
/// against the connection the pool hands out for that purpose; reads use
/// their own pooled checkout.
pub struct SqliteSource {
    name: String,
    table: String,
    pool: SqlitePool,
    readonly: bool,
    write_lock: Arc<Mutex<()>>,
}

impl SqliteSource {
    pub fn new(config: &SourceConfig, site_dir: &Path) -> Result<Self, SourceError> {
        let SourceKind::Sqlite { table, db, readonly } = &config.kind else {
            return Err(validation_err(&config.name, "type", "expected a sqlite descriptor"));
        };
        if !IDENTIFIER.is_match(table) {
            return Err(validation_err(&config.name, "table", "must match [A-Za-z_][A-Za-z0-9_]{0,63}"));
        }

        let db_path = if Path::new(db).is_absolute() { Path::new(db).to_path_buf() } else { site_dir.join(db) };
        let pool = SqlitePool::open(&db_path, SqlitePoolConfig::default()).map_err(|err| SourceError::Connection {
            source: config.name.clone(),
            address: db_path.display().to_string(),
            wrapped: err.to_string(),
        })?;

        Ok(Self {
            name: config.name.clone(),
            table: table.clone(),
            pool,
            readonly: *readonly,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    async fn do_fetch(&self) -> Result<Vec<Row>, SourceError> {
        let pool = self.pool.clone();
        let table = self.table.clone();
        let name = self.name.clone();
        task::spawn_blocking(move || fetch_rows(&pool, &table, &name))
            .await
            .map_err(|err| join_err(&name, err))?
    }
}

fn fetch_rows(pool: &SqlitePool, table: &str, name: &str) -> Result<Vec<Row>, SourceError> {
    let conn = checkout(pool, name)?;
    let sql = format!("SELECT * FROM {table} ORDER BY created_at DESC");
    let mut stmt = conn.prepare(&sql).map_err(|err| sql_err(name, "prepare", &err))?;
    let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let rows = stmt
        .query_map([], |sql_row| {
            let mut row = Row::new();
            for (index, column) in column_names.iter().enumerate() {
                row.insert(column.clone(), value_from_sqlite(sql_row.get_ref(index)?));
            }
            Ok(row)
        })
        .map_err(|err| sql_err(name, "query", &err))?;

    rows.collect::<Result<Vec<_>, _>>().map_err(|err| sql_err(name, "read rows", &err))
}

fn value_from_sqlite(value_ref: ValueRef<'_>) -> Value {
    match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(bytes) => Value::from(String::from_utf8_lossy(bytes).to_string()),
        ValueRef::Blob(bytes) => Value::from(String::from_utf8_lossy(bytes).to_string()),
    }
}

fn checkout(pool: &SqlitePool, name: &str) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>, SourceError> {
    pool.get().map_err(|err| SourceError::Connection { source: name.to_string(), address: "sqlite".to_string(), wrapped: err.to_string() })
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool, rusqlite::Error> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Maps a JSON value kind to the SQL column type used when inferring a
/// new table's schema. Rows are JSON-valued, so there is no distinct
/// temporal kind to detect the way the original implementation's typed
/// host values carried one; timestamp-shaped fields collapse to TEXT the
/// same as any other string.
fn infer_sql_type(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "INTEGER",
        Value::Number(n) if n.is_i64() || n.is_u64() => "INTEGER",
        Value::Number(_) => "REAL",
        _ => "TEXT",
    }
}

fn create_table(conn: &Connection, table: &str, data: &Row) -> Result<(), rusqlite::Error> {
    let mut columns = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
    for (key, value) in data {
        if !is_writable_field(key) {
            continue;
        }
        columns.push(format!("{key} {}", infer_sql_type(value)));
    }
    columns.push("created_at DATETIME DEFAULT CURRENT_TIMESTAMP".to_string());
    let sql = format!("CREATE TABLE {table} ({})", columns.join(", "));
    conn.execute(&sql, [])?;
    Ok(())
}

/// Drops `_`-prefixed keys (e.g. `_meta`) and anything that is not a
/// valid SQL identifier before it is allowed anywhere near a query
/// string, per the spec's injection-avoidance requirement for the write
/// path.
fn is_writable_field(key: &str) -> bool {
    !key.starts_with('_') && IDENTIFIER.is_match(key) && !key.eq_ignore_ascii_case("id")
}

fn value_to_sql(value: &Value) -> Box<dyn ToSql> {
    match value {
        Value::Null => Box::new(Option::<String>::None),
        Value::Bool(b) => Box::new(*b as i64),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Box::new(i)
            } else {
                Box::new(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => Box::new(s.clone()),
        other => Box::new(other.to_string()),
    }
}

fn insert_row(conn: &Connection, table: &str, data: &Row) -> Result<(), rusqlite::Error> {
    let fields: Vec<&String> = data.keys().filter(|k| is_writable_field(k)).collect();
    if fields.is_empty() {
        let sql = format!("INSERT INTO {table} DEFAULT VALUES");
        conn.execute(&sql, [])?;
        return Ok(());
    }
    let columns = fields.iter().map(|f| f.as_str()).collect::<Vec<_>>().join(", ");
    let placeholders = fields.iter().enumerate().map(|(i, _)| format!("?{}", i + 1)).collect::<Vec<_>>().join(", ");
    let sql = format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})");
    let values: Vec<Box<dyn ToSql>> = fields.iter().map(|f| value_to_sql(&data[f.as_str()])).collect();
    let refs: Vec<&dyn ToSql> = values.iter().map(std::convert::AsRef::as_ref).collect();
    conn.execute(&sql, refs.as_slice())?;
    Ok(())
}

fn update_row(conn: &Connection, table: &str, id: &str, data: &Row) -> Result<usize, rusqlite::Error> {
    let fields: Vec<&String> = data.keys().filter(|k| is_writable_field(k)).collect();
    if fields.is_empty() {
        return Ok(0);
    }
    let assignments = fields.iter().enumerate().map(|(i, f)| format!("{f} = ?{}", i + 1)).collect::<Vec<_>>().join(", ");
    let sql = format!("UPDATE {table} SET {assignments} WHERE id = ?{}", fields.len() + 1);
    let mut values: Vec<Box<dyn ToSql>> = fields.iter().map(|f| value_to_sql(&data[f.as_str()])).collect();
    values.push(Box::new(id.to_string()));
    let refs: Vec<&dyn ToSql> = values.iter().map(std::convert::AsRef::as_ref).collect();
    conn.execute(&sql, refs.as_slice())
}

fn delete_row(conn: &Connection, table: &str, id: &str) -> Result<usize, rusqlite::Error> {
    let sql = format!("DELETE FROM {table} WHERE id = ?1");
    conn.execute(&sql, [id])
}

fn validation_err(source: &str, field: &str, reason: &str) -> SourceError {
    SourceError::Validation { source: source.to_string(), field: field.to_string(), reason: reason.to_string() }
}

fn sql_err(name: &str, operation: &str, err: &rusqlite::Error) -> SourceError {
    SourceError::Source { source: name.to_string(), operation: operation.to_string(), wrapped: err.to_string(), retryable: false }
}

fn join_err(name: &str, err: task::JoinError) -> SourceError {
    SourceError::Source { source: name.to_string(), operation: "spawn_blocking".to_string(), wrapped: err.to_string(), retryable: false }
}

#[async_trait]
impl Source for SqliteSource {
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

#[async_trait]
impl WritableSource for SqliteSource {
    async fn write_item(&self, _cancel: &CancellationToken, action: WriteAction) -> Result<(), WriteError> {
        if self.readonly {
            return Err(WriteError::Source(validation_err(&self.name, "readonly", "this source does not accept writes")));
        }

        let pool = self.pool.clone();
        let table = self.table.clone();
        let name = self.name.clone();
        let write_lock = Arc::clone(&self.write_lock);
        task::spawn_blocking(move || -> Result<(), SourceError> {
            let _guard = write_lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let conn = checkout(&pool, &name)?;
            match &action {
                WriteAction::Add { data } => {
                    let exists = table_exists(&conn, &table).map_err(|err| sql_err(&name, "check schema", &err))?;
                    if !exists {
                        create_table(&conn, &table, data).map_err(|err| sql_err(&name, "create table", &err))?;
                    }
                    insert_row(&conn, &table, data).map_err(|err| sql_err(&name, "insert", &err))
                }
                WriteAction::Update { data } => {
                    let id = action.id().ok_or_else(|| validation_err(&name, "id", "update requires an id"))?;
                    let affected = update_row(&conn, &table, id, data).map_err(|err| sql_err(&name, "update", &err))?;
                    if affected == 0 {
                        return Err(validation_err(&name, "id", &format!("no row with id {id}")));
                    }
                    Ok(())
                }
                WriteAction::Delete { .. } => {
                    let id = action.id().ok_or_else(|| validation_err(&name, "id", "delete requires an id"))?;
                    let affected = delete_row(&conn, &table, id).map_err(|err| sql_err(&name, "delete", &err))?;
                    if affected == 0 {
                        return Err(validation_err(&name, "id", &format!("no row with id {id}")));
                    }
                    Ok(())
                }
                WriteAction::Toggle { .. } => {
                    Err(validation_err(&name, "action", "toggle is not supported by sqlite sources"))
                }
            }
        })
        .await
        .map_err(|err| WriteError::Source(join_err(&self.name, err)))??;
        Ok(())
    }

    fn is_readonly(&self) -> bool {
        self.readonly
    }
}

#[cfg(test)]
mod tests {
    use pulsearc_domain::row_from_pairs;
    use serde_json::json;

    use super::*;

    fn config(table: &str, readonly: bool) -> SourceConfig {
        SourceConfig {
            name: "notes".to_string(),
            kind: SourceKind::Sqlite { table: table.to_string(), db: "notes.db".to_string(), readonly },
            cache: Default::default(),
            retry: Default::default(),
            timeout: None,
        }
    }

    #[test]
    fn rejects_invalid_table_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config("notes", false);
        if let SourceKind::Sqlite { table, .. } = &mut cfg.kind {
            *table = "notes; DROP TABLE users".to_string();
        }
        let err = SqliteSource::new(&cfg, dir.path()).unwrap_err();
        assert!(matches!(err, SourceError::Validation { .. }));
    }

    #[tokio::test]
    async fn add_creates_table_then_fetch_returns_it() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = SqliteSource::new(&config("notes", false), dir.path()).unwrap();
        let cancel = CancellationToken::new();

        let data = row_from_pairs([("text", json!("Buy milk")), ("done", json!(false))]);
        adapter.write_item(&cancel, WriteAction::Add { data }).await.unwrap();

        let rows = adapter.fetch(&cancel).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("text"), Some(&json!("Buy milk")));
    }

    #[tokio::test]
    async fn readonly_source_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = SqliteSource::new(&config("notes", true), dir.path()).unwrap();
        let cancel = CancellationToken::new();
        let data = row_from_pairs([("text", json!("x"))]);
        let err = adapter.write_item(&cancel, WriteAction::Add { data }).await.unwrap_err();
        assert!(matches!(err, WriteError::Source(SourceError::Validation { .. })));
    }

    #[tokio::test]
    async fn update_and_delete_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = SqliteSource::new(&config("notes", false), dir.path()).unwrap();
        let cancel = CancellationToken::new();

        let data = row_from_pairs([("text", json!("Buy milk"))]);
        adapter.write_item(&cancel, WriteAction::Add { data }).await.unwrap();
        let rows = adapter.fetch(&cancel).await.unwrap();
        let id = rows[0].get("id").unwrap().to_string();

        let update_data = row_from_pairs([("id", json!(id.trim_matches('"'))), ("text", json!("Buy bread"))]);
        adapter.write_item(&cancel, WriteAction::Update { data: update_data }).await.unwrap();
        let rows = adapter.fetch(&cancel).await.unwrap();
        assert_eq!(rows[0].get("text"), Some(&json!("Buy bread")));

        let delete_data = row_from_pairs([("id", json!(id.trim_matches('"')))]);
        adapter.write_item(&cancel, WriteAction::Delete { data: delete_data }).await.unwrap();
        let rows = adapter.fetch(&cancel).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn underscore_prefixed_and_invalid_fields_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = SqliteSource::new(&config("notes", false), dir.path()).unwrap();
        let cancel = CancellationToken::new();

        let data = row_from_pairs([("text", json!("x")), ("_meta", json!("ignored")), ("bad col", json!("ignored"))]);
        adapter.write_item(&cancel, WriteAction::Add { data }).await.unwrap();
        let rows = adapter.fetch(&cancel).await.unwrap();
        assert!(rows[0].get("_meta").is_none());
        assert!(rows[0].get("bad col").is_none());
    }
}
