//! Query safety classification module.
//!
//! Parses SQL and classifies it as read-only, mutating, or destructive so
//! the runner can refuse writes before they reach the datastore.

mod parser;

pub use parser::{classify_sql, SqlClassifier};

use std::fmt;

/// Safety level classification for SQL queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SafetyLevel {
    /// Read-only queries (SELECT, WITH, VALUES, plain EXPLAIN).
    Safe,
    /// Data or session modification (INSERT, UPDATE, PRAGMA, ATTACH).
    Mutating,
    /// Data loss or schema changes (DELETE, DROP, ALTER, CREATE).
    Destructive,
    /// The SQL could not be parsed; only the engine's read-only mode guards it.
    Unknown,
}

impl SafetyLevel {
    /// Returns true if the statement writes and must be rejected.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Mutating | Self::Destructive)
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "Safe"),
            Self::Mutating => write!(f, "Mutating"),
            Self::Destructive => write!(f, "Destructive"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// The type of SQL statement detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementType {
    Select,
    Insert,
    Update,
    Delete,
    Drop,
    Truncate,
    Alter,
    Create,
    Grant,
    Revoke,
    Explain,
    Merge,
    Pragma,
    Attach,
    /// Multiple statements detected; contains the most dangerous type.
    Multiple(Box<StatementType>),
    /// Statement type could not be determined.
    Unknown,
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Drop => write!(f, "DROP"),
            Self::Truncate => write!(f, "TRUNCATE"),
            Self::Alter => write!(f, "ALTER"),
            Self::Create => write!(f, "CREATE"),
            Self::Grant => write!(f, "GRANT"),
            Self::Revoke => write!(f, "REVOKE"),
            Self::Explain => write!(f, "EXPLAIN"),
            Self::Merge => write!(f, "MERGE"),
            Self::Pragma => write!(f, "PRAGMA"),
            Self::Attach => write!(f, "ATTACH"),
            Self::Multiple(inner) => write!(f, "Multiple ({})", inner),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Result of classifying a SQL query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    /// The determined safety level.
    pub level: SafetyLevel,
    /// The type of statement(s) detected.
    pub statement_type: StatementType,
    /// Optional warning message for the user.
    pub warning: Option<String>,
}

impl ClassificationResult {
    /// Creates a new classification result.
    pub fn new(level: SafetyLevel, statement_type: StatementType) -> Self {
        Self {
            level,
            statement_type,
            warning: None,
        }
    }

    /// Creates a classification result with a warning message.
    pub fn with_warning(
        level: SafetyLevel,
        statement_type: StatementType,
        warning: impl Into<String>,
    ) -> Self {
        Self {
            level,
            statement_type,
            warning: Some(warning.into()),
        }
    }

    /// Returns true if the query must be rejected before execution.
    pub fn is_write(&self) -> bool {
        self.level.is_write()
    }

    /// Describes why a write was rejected.
    pub fn rejection_message(&self) -> String {
        format!(
            "{} statements are not allowed; the datastore is read-only",
            self.statement_type
        )
    }
}
