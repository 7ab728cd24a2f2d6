//! Output formatting for the command line.
//!
//! Renders query outcomes, the catalog, and the table overview as aligned
//! text or as JSON.

use serde::Serialize;

use crate::catalog::{CatalogEntry, QueryCatalog};
use crate::config::OutputFormat;
use crate::db::{ColumnInfo, QueryResult, Row, Schema};
use crate::error::{ReportError, Result};
use crate::runner::QueryOutcome;

/// Longest cell rendered in text output before it is cut with an ellipsis.
const MAX_COLUMN_WIDTH: usize = 48;

/// JSON document for a query outcome.
#[derive(Debug, Serialize)]
struct JsonOutput<'a> {
    source: String,
    columns: &'a [ColumnInfo],
    rows: &'a [Row],
    row_count: usize,
    total_rows: Option<usize>,
    was_truncated: bool,
    execution_time_ms: u64,
}

#[derive(Debug, Serialize)]
struct JsonCatalogEntry<'a> {
    id: &'a str,
    label: &'a str,
}

/// Formats results for stdout.
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a query outcome.
    pub fn format_outcome(&self, outcome: &QueryOutcome) -> Result<String> {
        match self.format {
            OutputFormat::Text => Ok(format_text(&outcome.result, outcome.execution_time.as_millis())),
            OutputFormat::Json => to_json(&JsonOutput {
                source: outcome.source.to_string(),
                columns: &outcome.result.columns,
                rows: &outcome.result.rows,
                row_count: outcome.result.row_count,
                total_rows: outcome.result.total_rows,
                was_truncated: outcome.result.was_truncated,
                execution_time_ms: outcome.execution_time.as_millis() as u64,
            }),
        }
    }

    /// Formats the catalog listing.
    pub fn format_catalog(&self, catalog: &QueryCatalog) -> Result<String> {
        match self.format {
            OutputFormat::Text => {
                let width = catalog
                    .list()
                    .iter()
                    .map(|(id, _)| id.len())
                    .max()
                    .unwrap_or(0);
                let lines = catalog
                    .list()
                    .into_iter()
                    .map(|(id, label)| format!("{:width$}  {}", id, label, width = width))
                    .collect::<Vec<_>>();
                Ok(format!("{}\n", lines.join("\n")))
            }
            OutputFormat::Json => {
                let entries = catalog
                    .list()
                    .into_iter()
                    .map(|(id, label)| JsonCatalogEntry { id, label })
                    .collect::<Vec<_>>();
                to_json(&entries)
            }
        }
    }

    /// Formats one catalog entry in full.
    pub fn format_entry(&self, entry: &CatalogEntry) -> Result<String> {
        match self.format {
            OutputFormat::Text => Ok(format!("{entry}\n")),
            OutputFormat::Json => to_json(entry),
        }
    }

    /// Formats the table overview.
    pub fn format_tables(&self, schema: &Schema) -> Result<String> {
        match self.format {
            OutputFormat::Text => Ok(format!("{}\n", schema.format_for_display())),
            OutputFormat::Json => to_json(schema),
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map(|mut json| {
            json.push('\n');
            json
        })
        .map_err(|e| ReportError::internal(format!("Failed to serialize output: {e}")))
}

/// Cuts `s` to `max_width` characters, ending in `...` when cut.
fn truncate(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        s.chars().take(max_width).collect()
    } else {
        let kept = s.chars().take(max_width - 3).collect::<String>();
        format!("{kept}...")
    }
}

/// Renders a result as an aligned table with a footer.
fn format_text(result: &QueryResult, elapsed_ms: u128) -> String {
    let mut output = String::new();

    if result.columns.is_empty() {
        output.push_str("(empty result)\n");
    } else {
        let headers = result
            .columns
            .iter()
            .map(|c| truncate(&c.name, MAX_COLUMN_WIDTH))
            .collect::<Vec<_>>();
        let rows = result
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|v| truncate(&v.to_display_string(), MAX_COLUMN_WIDTH))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.chars().count());
                }
            }
        }

        let render_line = |cells: &[String]| {
            cells
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    let width = widths.get(i).copied().unwrap_or(0);
                    format!("{:width$}", cell, width = width)
                })
                .collect::<Vec<_>>()
                .join(" │ ")
                .trim_end()
                .to_string()
        };

        output.push_str(&render_line(&headers));
        output.push('\n');
        let separator = widths.iter().map(|w| "─".repeat(*w)).collect::<Vec<_>>();
        output.push_str(&separator.join("─┼─"));
        output.push('\n');
        for row in &rows {
            output.push_str(&render_line(row));
            output.push('\n');
        }
    }

    output.push_str(&format!(
        "{} row{} returned ({}ms)\n",
        result.row_count,
        if result.row_count == 1 { "" } else { "s" },
        elapsed_ms
    ));

    if let Some(warning) = result.truncation_warning() {
        output.push_str(&warning);
        output.push('\n');
    }

    output
}
