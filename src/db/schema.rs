//! Datastore schema types for rental-lens.
//!
//! Represents the tables registered in the datastore, their columns, and
//! row counts, so reports can check their dependencies before running.

use serde::Serialize;

/// Represents the set of tables currently registered in the datastore.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Schema {
    /// All tables, ordered by name.
    pub tables: Vec<Table>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the table with the given name, compared case-insensitively.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Returns true if a table with the given name is registered.
    pub fn has_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    /// Total number of rows across all tables.
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.row_count).sum()
    }

    /// Total number of columns across all tables.
    pub fn total_columns(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }

    /// Formats the schema as a short listing for display.
    pub fn format_for_display(&self) -> String {
        let table_lines = self
            .tables
            .iter()
            .map(|table| {
                let columns = table
                    .columns
                    .iter()
                    .map(|c| format!("{} {}", c.name, c.data_type))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("  - {} ({} rows): {}\n", table.name, table.row_count, columns)
            })
            .collect::<Vec<_>>()
            .join("");

        format!(
            "Tables: {} | Rows: {} | Columns: {}\n{}",
            self.tables.len(),
            self.total_rows(),
            self.total_columns(),
            table_lines
        )
    }
}

/// Represents a datastore table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Columns in declaration order.
    pub columns: Vec<Column>,

    /// Number of rows in the table.
    pub row_count: u64,
}

impl Table {
    /// Creates a new table with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            row_count: 0,
        }
    }

    /// Sets the columns.
    pub fn with_columns(self, columns: Vec<Column>) -> Self {
        Self { columns, ..self }
    }

    /// Sets the row count.
    pub fn with_row_count(self, row_count: u64) -> Self {
        Self { row_count, ..self }
    }
}

/// Represents a column in a table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Declared type (e.g., "INTEGER", "TIMESTAMP"); empty when undeclared.
    pub data_type: String,
}

impl Column {
    /// Creates a new column with the given name and data type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}
