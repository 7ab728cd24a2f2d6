//! Command-line argument parsing for rental-lens.

use crate::catalog::ReportParams;
use crate::config::{Config, OutputFormat};
use crate::error::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

/// Canned analytical reports over a read-only DVD rental datastore.
#[derive(Parser, Debug)]
#[command(name = "rental-lens")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file (in-memory when omitted)
    #[arg(long, value_name = "PATH", global = true)]
    pub db: Option<PathBuf>,

    /// Directory of .sql seed scripts
    #[arg(long, value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Extra seed script (repeatable)
    #[arg(long, value_name = "FILE", global = true)]
    pub seed: Vec<PathBuf>,

    /// Output format
    #[arg(long, value_enum, value_name = "FORMAT", global = true)]
    pub format: Option<FormatArg>,

    /// Maximum rows returned per query
    #[arg(long, value_name = "N", global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_rows: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// List catalog reports
    List,

    /// Show a report's definition
    Show {
        /// Report id
        id: String,
    },

    /// Run a catalog report
    Run {
        /// Report id
        id: String,

        /// Report parameter (repeatable)
        #[arg(short, long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Shorthand for --param top_n=N
        #[arg(long, value_name = "N")]
        top: Option<i64>,
    },

    /// Run an ad-hoc read-only SQL query
    Sql {
        /// SQL text
        sql: String,
    },

    /// Show the tables loaded into the datastore
    Tables,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies command-line overrides on top of `config`.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(db) = &self.db {
            config.datastore.path = Some(db.clone());
        }
        if let Some(dir) = &self.data_dir {
            config.datastore.data_dir = Some(dir.clone());
        }
        config.datastore.seed_files.extend(self.seed.iter().cloned());
        if let Some(format) = self.format {
            config.output.format = format.into();
        }
        if let Some(max_rows) = self.max_rows {
            config.output.max_rows = max_rows as usize;
        }
    }
}

impl Command {
    /// Collects the report parameters of a `run` command.
    pub fn report_params(&self) -> Result<ReportParams> {
        match self {
            Command::Run { params, top, .. } => {
                let mut report_params = ReportParams::from_assignments(params)?;
                if let Some(top) = top {
                    report_params.set("top_n", *top);
                }
                Ok(report_params)
            }
            _ => Ok(ReportParams::new()),
        }
    }
}
