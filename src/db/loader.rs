//! Seed script loading.
//!
//! Populates the datastore before it is sealed. Every `*.sql` file in the
//! configured data directory is executed in file-name order, followed by any
//! explicitly listed seed files. Each script is expected to create the table
//! named after its file stem, and is skipped when a file-backed datastore
//! already holds that table from an earlier load.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{DatabaseClient, SqliteClient};
use crate::config::DatastoreConfig;
use crate::error::{ReportError, Result};

/// A seed script and the table name derived from its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedScript {
    pub path: PathBuf,
    pub table_name: String,
}

impl SeedScript {
    /// Creates a seed script entry for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let table_name = table_name_for(&path);
        Self { path, table_name }
    }
}

/// Derives a table name from a file path: stem, lowercased, spaces to `_`.
pub fn table_name_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_lowercase().replace(' ', "_"))
        .unwrap_or_default()
}

/// Collects the seed scripts named by `config`, data directory first.
pub fn collect_seed_scripts(config: &DatastoreConfig) -> Result<Vec<SeedScript>> {
    let mut scripts = Vec::new();

    if let Some(dir) = &config.data_dir {
        if !dir.is_dir() {
            return Err(ReportError::datastore(format!(
                "Data directory not found: {}",
                dir.display()
            )));
        }

        let entries = std::fs::read_dir(dir).map_err(|e| {
            ReportError::datastore(format!("Failed to read {}: {e}", dir.display()))
        })?;

        let mut paths = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
            })
            .collect::<Vec<_>>();
        paths.sort();

        if paths.is_empty() {
            warn!("No .sql seed scripts found in {}", dir.display());
        }

        scripts.extend(paths.into_iter().map(SeedScript::new));
    }

    scripts.extend(config.seed_files.iter().map(SeedScript::new));

    Ok(scripts)
}

/// Executes each seed script and returns the tables registered afterward.
///
/// A script that fails aborts loading. A script that does not create the
/// table named after its file only produces a warning, since one script may
/// legitimately populate several tables.
pub async fn load_seed_scripts(client: &SqliteClient, scripts: &[SeedScript]) -> Result<Vec<String>> {
    let existing = client.table_names().await?;

    for script in scripts {
        if existing
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&script.table_name))
        {
            info!(
                "Table '{}' already present, skipping {}",
                script.table_name,
                script.path.display()
            );
            continue;
        }

        let sql = std::fs::read_to_string(&script.path).map_err(|e| {
            ReportError::datastore(format!(
                "Failed to read seed script {}: {e}",
                script.path.display()
            ))
        })?;

        debug!("Loading seed script {}", script.path.display());
        client.execute_script(&sql).await.map_err(|e| {
            ReportError::datastore(format!("Seed script {} failed: {e}", script.path.display()))
        })?;
    }

    let tables = client.table_names().await?;

    for script in scripts {
        if !tables.iter().any(|t| t.eq_ignore_ascii_case(&script.table_name)) {
            warn!(
                "Seed script {} did not create table '{}'",
                script.path.display(),
                script.table_name
            );
        }
    }

    if !tables.is_empty() {
        info!("Registered tables: {}", tables.join(", "));
    }

    Ok(tables)
}
