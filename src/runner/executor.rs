//! Query execution with write rejection.
//!
//! Isolated from the CLI so it can be exercised against the mock client.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::catalog::{QueryCatalog, ReportParams};
use crate::db::{DatabaseClient, QueryResult, Schema};
use crate::error::{ReportError, Result};
use crate::safety::{ClassificationResult, SafetyLevel, SqlClassifier};

/// Default cap on rows returned per query.
pub const DEFAULT_MAX_ROWS: usize = 1000;

/// Where an executed query came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySource {
    /// A catalog entry, by id.
    Catalog(String),
    /// SQL typed by the user.
    AdHoc,
}

impl fmt::Display for QuerySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog(id) => write!(f, "catalog:{id}"),
            Self::AdHoc => write!(f, "ad-hoc"),
        }
    }
}

/// Successful query execution outcome.
#[derive(Debug)]
pub struct QueryOutcome {
    /// The query result.
    pub result: QueryResult,
    /// Wall-clock time spent in the runner, including classification.
    pub execution_time: Duration,
    /// What was run.
    pub source: QuerySource,
}

/// Runs catalog entries and ad-hoc SQL.
pub struct QueryRunner<'a> {
    db: &'a dyn DatabaseClient,
    catalog: &'a QueryCatalog,
    classifier: SqlClassifier,
    max_rows: usize,
}

impl<'a> QueryRunner<'a> {
    /// Creates a runner over `db` and `catalog`.
    pub fn new(db: &'a dyn DatabaseClient, catalog: &'a QueryCatalog) -> Self {
        Self {
            db,
            catalog,
            classifier: SqlClassifier::new(),
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    /// Sets the maximum number of rows returned per query.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Runs the catalog entry `id` with `params`.
    ///
    /// Fails with `NotFound` for an unknown id and `MissingTables` when the
    /// datastore lacks a table the entry declares.
    pub async fn run_catalog_entry(&self, id: &str, params: &ReportParams) -> Result<QueryOutcome> {
        let entry = self.catalog.get(id)?;

        if !entry.required_tables().is_empty() {
            let missing = self.db.missing_tables(entry.required_tables()).await?;
            if !missing.is_empty() {
                return Err(ReportError::MissingTables {
                    report: id.to_string(),
                    tables: missing,
                });
            }
        }

        let sql = entry.render(params)?;
        info!("Running report '{}'", id);
        self.execute(&sql, QuerySource::Catalog(id.to_string()))
            .await
    }

    /// Runs user-supplied SQL. Blank input fails without touching the datastore.
    pub async fn run_ad_hoc(&self, sql: &str) -> Result<QueryOutcome> {
        if sql.trim().trim_end_matches(';').trim().is_empty() {
            return Err(ReportError::query("empty SQL statement"));
        }
        self.run(sql).await
    }

    /// Classifies and executes `sql` as given.
    pub async fn run(&self, sql: &str) -> Result<QueryOutcome> {
        self.execute(sql, QuerySource::AdHoc).await
    }

    /// Returns the tables registered in the datastore.
    pub async fn tables(&self) -> Result<Schema> {
        self.db.introspect_schema().await
    }

    /// Classifies `sql`, rejecting writes before they reach the datastore.
    fn check_read_only(&self, sql: &str) -> Result<ClassificationResult> {
        let classification = self.classifier.classify(sql);

        if classification.is_write() {
            warn!(
                "Rejected {} statement ({})",
                classification.statement_type, classification.level
            );
            return Err(ReportError::read_only(classification.rejection_message()));
        }

        if classification.level == SafetyLevel::Unknown {
            if let Some(warning) = &classification.warning {
                debug!("{}", warning);
            }
        }

        Ok(classification)
    }

    async fn execute(&self, sql: &str, source: QuerySource) -> Result<QueryOutcome> {
        let start = Instant::now();
        self.check_read_only(sql)?;

        let result = self.db.execute_query(sql, self.max_rows).await?;
        let execution_time = start.elapsed();

        debug!(
            "{} returned {} row(s) in {:?}",
            source, result.row_count, execution_time
        );
        if let Some(warning) = result.truncation_warning() {
            warn!("{}", warning);
        }

        Ok(QueryOutcome {
            result,
            execution_time,
            source,
        })
    }
}
