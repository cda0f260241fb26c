use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::error::TopicError;
use crate::predicate::ScalarValue;
use crate::schema::{create_table_sql, drop_table_sql, ColumnDef};

/// A backend result row, keyed by column name.
pub type RawRow = Map<String, Value>;

/// A named storage backend a topic may be attached to.
///
/// Implementations own their connection state; every call is an independent
/// request that either resolves or fails with the backend's own error.
#[async_trait]
pub trait Vault: Send + Sync {
    /// Create a table with the given columns.
    async fn create_table(&self, name: &str, columns: &[ColumnDef]) -> Result<(), TopicError>;

    /// Drop a table by name.
    async fn drop_table(&self, name: &str) -> Result<(), TopicError>;

    /// Run a statement and return its rows in backend order.
    async fn query(&self, sql: &str, params: &[ScalarValue]) -> Result<Vec<RawRow>, TopicError>;
}

/// A [`Vault`] backed by SQLite.
///
/// The connection is shared behind a mutex and every statement runs on the
/// blocking thread pool, so async callers are never parked on I/O.
#[derive(Clone)]
pub struct SqliteVault {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteVault {
    /// Opens (or creates) a SQLite database at the given file path.
    /// `":memory:"` opens an in-memory database.
    #[instrument(skip_all, fields(path = %path))]
    pub fn open(path: &str) -> Result<Self, TopicError> {
        if path == ":memory:" {
            return Self::open_memory();
        }
        let conn = Connection::open(path).map_err(TopicError::backend)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(TopicError::backend)?;
        debug!("Opened SqliteVault at {}", path);
        Ok(Self::from_connection(conn))
    }

    /// Opens an in-memory SQLite database (useful for testing).
    pub fn open_memory() -> Result<Self, TopicError> {
        let conn = Connection::open_in_memory().map_err(TopicError::backend)?;
        debug!("Opened in-memory SqliteVault");
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, TopicError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            f(&guard)
        })
        .await
        .map_err(TopicError::backend)?
        .map_err(TopicError::backend)
    }
}

#[async_trait]
impl Vault for SqliteVault {
    #[instrument(skip_all, fields(table = %name))]
    async fn create_table(&self, name: &str, columns: &[ColumnDef]) -> Result<(), TopicError> {
        let sql = create_table_sql(name, columns)?;
        debug!("CREATE TABLE SQL: {}", sql);
        self.with_conn(move |conn| conn.execute(&sql, []).map(|_| ()))
            .await
    }

    #[instrument(skip_all, fields(table = %name))]
    async fn drop_table(&self, name: &str) -> Result<(), TopicError> {
        let sql = drop_table_sql(name);
        self.with_conn(move |conn| conn.execute(&sql, []).map(|_| ()))
            .await?;
        debug!("Dropped table {}", name);
        Ok(())
    }

    #[instrument(skip_all)]
    async fn query(&self, sql: &str, params: &[ScalarValue]) -> Result<Vec<RawRow>, TopicError> {
        debug!(sql = %sql, params = params.len(), "Querying vault");
        let sql = sql.to_string();
        let values: Vec<SqlValue> = params.iter().map(scalar_to_sql).collect();

        let rows = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let col_names: Vec<String> =
                    stmt.column_names().into_iter().map(String::from).collect();

                let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
                    let mut map = Map::new();
                    for (i, col_name) in col_names.iter().enumerate() {
                        map.insert(col_name.clone(), sql_to_json(row.get_ref(i)?));
                    }
                    Ok(map)
                })?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await?;

        debug!("Queried {} rows", rows.len());
        Ok(rows)
    }
}

fn scalar_to_sql(value: &ScalarValue) -> SqlValue {
    match value {
        ScalarValue::Bool(b) => SqlValue::Integer(i64::from(*b)),
        ScalarValue::Integer(n) => SqlValue::Integer(*n),
        ScalarValue::Float(n) => SqlValue::Real(*n),
        ScalarValue::String(s) => SqlValue::Text(s.clone()),
    }
}

fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Number(n.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<blob {} bytes>", b.len())),
    }
}
