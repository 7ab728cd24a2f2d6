//! Datastore abstraction layer for rental-lens.
//!
//! Provides a trait-based interface for datastore operations, allowing the
//! runner to be exercised against SQLite or an in-process mock.

pub mod loader;
mod mock;
mod schema;
mod sqlite;
mod types;

pub use mock::MockDatabaseClient;
pub use schema::{Column, Schema, Table};
pub use sqlite::SqliteClient;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::config::DatastoreConfig;
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Opens the datastore described by `config`, runs its seed scripts, and
/// seals it read-only.
///
/// This is the central factory function for datastore sessions.
pub async fn open(config: &DatastoreConfig) -> Result<SqliteClient> {
    let client = SqliteClient::connect(config).await?;

    let scripts = loader::collect_seed_scripts(config)?;
    let loaded = loader::load_seed_scripts(&client, &scripts).await?;

    client.seal().await?;
    info!(
        "Datastore ready: {} seed script(s) loaded, {} table(s) registered",
        scripts.len(),
        loaded.len()
    );

    Ok(client)
}

/// Trait defining the interface for datastore clients.
///
/// All operations are async and return Results with ReportError.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Returns the names of registered tables and views, sorted.
    async fn table_names(&self) -> Result<Vec<String>>;

    /// Returns the subset of `required` that is not registered, in input order.
    /// Names compare case-insensitively, as SQLite resolves them.
    async fn missing_tables(&self, required: &[String]) -> Result<Vec<String>> {
        let registered = self.table_names().await?;
        Ok(required
            .iter()
            .filter(|name| !registered.iter().any(|r| r.eq_ignore_ascii_case(name)))
            .cloned()
            .collect())
    }

    /// Introspects the datastore, returning registered tables with row counts.
    async fn introspect_schema(&self) -> Result<Schema>;

    /// Executes a SQL query and returns at most `max_rows` rows.
    async fn execute_query(&self, sql: &str, max_rows: usize) -> Result<QueryResult>;

    /// Closes the datastore connection.
    async fn close(&self) -> Result<()>;
}
