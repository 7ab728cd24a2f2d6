//! SQLite datastore client implementation.
//!
//! Provides the `SqliteClient` struct that implements the `DatabaseClient`
//! trait over an embedded SQLite database using sqlx. The database is
//! writable only until it is sealed; after that the connection runs with
//! `PRAGMA query_only` and every write is refused by the engine.

use crate::config::DatastoreConfig;
use crate::db::{Column, ColumnInfo, DatabaseClient, QueryResult, Row, Schema, Table, Value};
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, TypeInfo, ValueRef};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Declared column types whose text cells are parsed as timestamps.
const TIMESTAMP_TYPES: &[&str] = &["DATETIME", "DATE", "TIMESTAMP"];

/// Virtual machine instructions between deadline checks.
const PROGRESS_INTERVAL: i32 = 10_000;

/// Embedded SQLite datastore client.
#[derive(Debug)]
pub struct SqliteClient {
    pool: SqlitePool,
    query_timeout: Duration,
    sealed: AtomicBool,
}

impl SqliteClient {
    /// Opens the database described by `config`.
    ///
    /// With no `path` the database lives in memory for the life of the
    /// client. The pool keeps exactly one connection alive so the in-memory
    /// data and the session-scoped `query_only` pragma are never lost.
    pub async fn connect(config: &DatastoreConfig) -> Result<Self> {
        let options = match &config.path {
            Some(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true),
            None => SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| ReportError::datastore(format!("Invalid database options: {e}")))?,
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| ReportError::datastore(format!("Failed to open datastore: {e}")))?;

        match &config.path {
            Some(path) => info!("Datastore opened at {}", path.display()),
            None => info!("In-memory datastore opened"),
        }

        Ok(Self {
            pool,
            query_timeout: Duration::from_secs(config.query_timeout_secs),
            sealed: AtomicBool::new(false),
        })
    }

    /// Opens an empty in-memory datastore with default settings.
    pub async fn in_memory() -> Result<Self> {
        Self::connect(&DatastoreConfig::default()).await
    }

    /// Executes a multi-statement script (DDL and inserts) before sealing.
    pub async fn execute_script(&self, sql: &str) -> Result<()> {
        if self.is_sealed() {
            return Err(ReportError::read_only(
                "datastore is sealed; scripts can only run during loading",
            ));
        }

        sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| ReportError::datastore(format_query_error(&e)))?;

        Ok(())
    }

    /// Switches the connection to read-only mode for the rest of the session.
    pub async fn seal(&self) -> Result<()> {
        if self.is_sealed() {
            return Ok(());
        }

        sqlx::query("PRAGMA query_only = ON")
            .execute(&self.pool)
            .await
            .map_err(|e| ReportError::datastore(format!("Failed to seal datastore: {e}")))?;

        self.sealed.store(true, Ordering::SeqCst);
        debug!("Datastore sealed read-only");
        Ok(())
    }

    /// Returns true once the datastore has been sealed.
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }

    /// Fetches column metadata for a query that returned no rows.
    async fn fetch_column_metadata(
        conn: &mut SqliteConnection,
        sql: &str,
    ) -> Result<Vec<ColumnInfo>> {
        let describe = conn
            .describe(sql)
            .await
            .map_err(|e| ReportError::query(format_query_error(&e)))?;

        Ok(describe
            .columns()
            .iter()
            .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
            .collect())
    }

    /// Runs `sql` on `conn`, interrupting the engine once the query timeout
    /// has elapsed so the connection is free for the next call.
    async fn fetch_with_deadline(
        &self,
        conn: &mut SqliteConnection,
        sql: &str,
    ) -> Result<Vec<SqliteRow>> {
        let timed_out = Arc::new(AtomicBool::new(false));

        if let Some(deadline) = Instant::now().checked_add(self.query_timeout) {
            let flag = Arc::clone(&timed_out);
            let mut handle = conn.lock_handle().await.map_err(|e| {
                ReportError::datastore(format!("Failed to lock connection: {e}"))
            })?;
            handle.set_progress_handler(PROGRESS_INTERVAL, move || {
                if Instant::now() < deadline {
                    return true;
                }
                flag.store(true, Ordering::SeqCst);
                false
            });
        }

        let fetched = sqlx::query(sql).fetch_all(&mut *conn).await;

        let mut handle = conn
            .lock_handle()
            .await
            .map_err(|e| ReportError::datastore(format!("Failed to lock connection: {e}")))?;
        handle.remove_progress_handler();
        drop(handle);

        if fetched.is_err() && timed_out.load(Ordering::SeqCst) {
            warn!("Query interrupted after {:?}", self.query_timeout);
            return Err(ReportError::query(format!(
                "Query timed out after {} seconds",
                self.query_timeout.as_secs()
            )));
        }

        fetched.map_err(|e| map_execution_error(&e))
    }

    /// Fetches columns for a specific table.
    async fn fetch_columns(&self, table_name: &str) -> Result<Vec<Column>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT name, type FROM pragma_table_info(?) ORDER BY cid")
                .bind(table_name)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    ReportError::query(format!("Failed to fetch columns for {table_name}: {e}"))
                })?;

        Ok(rows
            .into_iter()
            .map(|(name, data_type)| Column::new(name, data_type))
            .collect())
    }

    /// Counts the rows of a specific table.
    async fn fetch_row_count(&self, table_name: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table_name));
        let count: i64 = sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                ReportError::query(format!("Failed to count rows of {table_name}: {e}"))
            })?;

        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn table_names(&self) -> Result<Vec<String>> {
        sqlx::query_scalar(
            r#"
            SELECT name
            FROM sqlite_master
            WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ReportError::query(format!("Failed to fetch tables: {e}")))
    }

    async fn introspect_schema(&self) -> Result<Schema> {
        let names = self.table_names().await?;
        let mut tables = Vec::with_capacity(names.len());

        for name in names {
            let columns = self.fetch_columns(&name).await?;
            let row_count = self.fetch_row_count(&name).await?;
            tables.push(
                Table::new(name)
                    .with_columns(columns)
                    .with_row_count(row_count),
            );
        }

        Ok(Schema { tables })
    }

    async fn execute_query(&self, sql: &str, max_rows: usize) -> Result<QueryResult> {
        let start = Instant::now();

        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| ReportError::datastore(format!("Failed to acquire connection: {e}")))?;
        let result = self.fetch_with_deadline(&mut conn, sql).await?;

        let execution_time = start.elapsed();

        let columns: Vec<ColumnInfo> = match result.first() {
            Some(first_row) => first_row
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect(),
            None => Self::fetch_column_metadata(&mut conn, sql)
                .await
                .unwrap_or_default(),
        };

        let total_rows = result.len();
        let was_truncated = total_rows > max_rows;

        if was_truncated {
            warn!(
                "Query returned {} rows, truncating to {} rows",
                total_rows, max_rows
            );
        }

        let rows: Vec<Row> = result.iter().take(max_rows).map(convert_row).collect();
        let row_count = rows.len();

        Ok(QueryResult {
            columns,
            rows,
            execution_time,
            row_count,
            total_rows: Some(total_rows),
            was_truncated,
        })
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single cell to our Value type.
///
/// SQLite is dynamically typed, so the storage class of the cell decides the
/// decoding; the declared column type only promotes text to timestamps.
fn convert_value(row: &SqliteRow, index: usize, declared_type: &str) -> Value {
    let storage_class = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    match storage_class.as_str() {
        "INTEGER" | "BOOLEAN" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(|bytes| Value::Text(format!("<{} bytes>", bytes.len())))
            .unwrap_or(Value::Null),

        _ => {
            let Some(text) = row.try_get::<Option<String>, _>(index).ok().flatten() else {
                return Value::Null;
            };
            let is_temporal = TIMESTAMP_TYPES
                .iter()
                .any(|t| declared_type.eq_ignore_ascii_case(t));
            match is_temporal.then(|| Value::parse_timestamp(&text)).flatten() {
                Some(ts) => Value::Timestamp(ts),
                None => Value::Text(text),
            }
        }
    }
}

/// Maps an execution failure, recognising writes refused by `query_only`.
fn map_execution_error(error: &sqlx::Error) -> ReportError {
    let message = format_query_error(error);
    if message.to_lowercase().contains("readonly") {
        ReportError::read_only(message)
    } else {
        ReportError::query(message)
    }
}

/// Extracts the engine's message from a sqlx error.
fn format_query_error(error: &sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    }
}

/// Quotes an identifier for interpolation into SQL text.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
