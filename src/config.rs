//! Configuration management for rental-lens.
//!
//! Handles loading configuration from TOML files and environment variables:
//! where the datastore lives and how it is seeded, extra report definitions,
//! output defaults, and logging.

use crate::error::{ReportError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the seed script directory.
pub const DATA_DIR_ENV: &str = "RENTAL_LENS_DATA_DIR";

/// Main configuration structure for rental-lens.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Datastore location and seeding.
    #[serde(default)]
    pub datastore: DatastoreConfig,

    /// Additional report definitions.
    #[serde(default)]
    pub reports: ReportsConfig,

    /// Output defaults.
    #[serde(default)]
    pub output: OutputConfig,

    /// Log destination.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Datastore configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatastoreConfig {
    /// SQLite database file. In-memory when unset.
    pub path: Option<PathBuf>,

    /// Directory whose `*.sql` files seed the datastore.
    pub data_dir: Option<PathBuf>,

    /// Extra seed scripts, run after the data directory.
    #[serde(default)]
    pub seed_files: Vec<PathBuf>,

    /// Per-query timeout in seconds.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_query_timeout_secs() -> u64 {
    30
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            data_dir: None,
            seed_files: Vec::new(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

impl DatastoreConfig {
    /// Applies `RENTAL_LENS_DATA_DIR` when no data directory is configured.
    pub fn apply_env_defaults(&mut self) {
        if self.data_dir.is_none() {
            self.data_dir = std::env::var_os(DATA_DIR_ENV).map(PathBuf::from);
        }
    }
}

/// Custom report definitions.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReportsConfig {
    #[serde(default)]
    pub custom: Vec<CustomReportConfig>,
}

/// A report defined in the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomReportConfig {
    pub id: String,
    /// Display label; the id is used when unset.
    pub label: Option<String>,
    pub description: Option<String>,
    pub sql: String,
    /// Tables the report reads.
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub params: Vec<CustomParamConfig>,
}

/// An integer parameter of a custom report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomParamConfig {
    pub name: String,
    pub default: i64,
    #[serde(default)]
    pub min: i64,
}

/// Result rendering format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Maximum rows returned per query.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

fn default_max_rows() -> usize {
    1000
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            max_rows: default_max_rows(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log file; logs go to stderr when unset.
    pub file: Option<PathBuf>,
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rental-lens")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ReportError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            ReportError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.output.max_rows == 0 {
            return Err(ReportError::config("output.max_rows must be positive"));
        }
        if self.datastore.query_timeout_secs == 0 {
            return Err(ReportError::config(
                "datastore.query_timeout_secs must be positive",
            ));
        }
        Ok(())
    }
}
