//! Error types for rental-lens.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for catalog, datastore, and query operations.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A report with this id is already registered in the catalog.
    #[error("Duplicate report id: {0}")]
    DuplicateId(String),

    /// No report with this id exists in the catalog.
    #[error("Report not found: {0}")]
    NotFound(String),

    /// A report parameter is unknown or out of range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The datastore lacks tables a report depends on.
    #[error("Report '{report}' requires missing tables: {}", tables.join(", "))]
    MissingTables { report: String, tables: Vec<String> },

    /// Query execution errors (syntax errors, unknown columns, timeouts, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// A write or DDL statement was submitted against the read-only datastore.
    #[error("Read-only violation: {0}")]
    ReadOnlyViolation(String),

    /// Datastore errors (cannot open the database, seed script failed, etc.)
    #[error("Datastore error: {0}")]
    Datastore(String),

    /// Configuration errors (invalid config file, bad values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReportError {
    /// Creates a duplicate id error for the given report id.
    pub fn duplicate_id(id: impl Into<String>) -> Self {
        Self::DuplicateId(id.into())
    }

    /// Creates a not found error for the given report id.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Creates an invalid parameter error with the given message.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a read-only violation error with the given message.
    pub fn read_only(msg: impl Into<String>) -> Self {
        Self::ReadOnlyViolation(msg.into())
    }

    /// Creates a datastore error with the given message.
    pub fn datastore(msg: impl Into<String>) -> Self {
        Self::Datastore(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::DuplicateId(_) | Self::NotFound(_) => "Catalog Error",
            Self::InvalidParameter(_) => "Parameter Error",
            Self::MissingTables { .. } => "Schema Error",
            Self::Query(_) => "Query Error",
            Self::ReadOnlyViolation(_) => "Read-Only Violation",
            Self::Datastore(_) => "Datastore Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using ReportError.
pub type Result<T> = std::result::Result<T, ReportError>;
