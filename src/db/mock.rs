//! Mock datastore client for testing.
//!
//! Returns predefined results and records every statement it receives, so
//! tests can assert what did (or did not) reach the datastore.

use super::{ColumnInfo, DatabaseClient, QueryResult, Schema, Value};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// A mock datastore client that returns predefined results.
#[derive(Debug, Default)]
pub struct MockDatabaseClient {
    schema: Schema,
    executed: Mutex<Vec<String>>,
}

impl MockDatabaseClient {
    /// Creates a new mock client with an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new mock client with the given schema.
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema,
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Returns every SQL string passed to `execute_query`, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|sqls| sqls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.schema.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn introspect_schema(&self) -> Result<Schema> {
        Ok(self.schema.clone())
    }

    async fn execute_query(&self, sql: &str, _max_rows: usize) -> Result<QueryResult> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }

        let columns = vec![ColumnInfo::new("result", "TEXT")];
        let rows = vec![vec![Value::Text(format!("Mock result for: {}", sql))]];

        Ok(QueryResult::with_data(columns, rows).with_execution_time(Duration::from_millis(1)))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
