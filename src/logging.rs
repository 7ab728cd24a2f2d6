//! Logging configuration for rental-lens.
//!
//! Logs go to stderr so stdout carries only report output, or to a file when
//! `logging.file` is configured. `RUST_LOG` overrides the default `info` level.

use std::fs::{self, File};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes logging according to `config`.
pub fn init(config: &LoggingConfig) {
    match &config.file {
        Some(path) => init_file_logging(path),
        None => init_stderr_logging(),
    }
}

/// Initializes logging to `log_path`, truncating it.
///
/// Falls back to stderr when the file cannot be created.
pub fn init_file_logging(log_path: &Path) {
    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory: {e}");
            init_stderr_logging();
            return;
        }
    }

    let log_file = match File::create(log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {e}");
            init_stderr_logging();
            return;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(log_file)
        .with_ansi(false)
        .init();
}

/// Initializes logging to stderr.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}
