//! Logging setup.
//!
//! Installs a global tracing subscriber that writes to stdout and appends to
//! a fixed log file (`<log_dir>/<file_name>`). The filter comes from
//! `RUST_LOG`, defaulting to `info`.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::error::AppError;

/// Log file for offline commands (train/evaluate/predict).
pub const PIPELINE_LOG: &str = "pipeline.log";
/// Log file for the HTTP service.
pub const API_LOG: &str = "api_logs.log";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to prepare log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to create log file at {path}: {source}")]
    CreateLogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

impl From<LoggingError> for AppError {
    fn from(e: LoggingError) -> Self {
        AppError::io(e.to_string())
    }
}

/// Initialize tracing. The returned guard must be held until exit so
/// buffered file output is flushed.
pub fn init(log_dir: &Path, file_name: &str) -> Result<WorkerGuard, LoggingError> {
    fs::create_dir_all(log_dir).map_err(|source| LoggingError::CreateDir {
        path: log_dir.to_path_buf(),
        source,
    })?;
    let log_path = log_dir.join(file_name);
    ensure_file_exists(&log_path)?;

    let file_appender = rolling::never(log_dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let stdout_layer = fmt::layer().with_target(false).with_writer(std::io::stdout);
    let file_layer = fmt::layer().with_ansi(false).with_writer(file_writer);

    let subscriber = Registry::default()
        .with(build_env_filter())
        .with(stdout_layer)
        .with(file_layer);
    tracing::subscriber::set_global_default(subscriber)?;

    tracing::debug!("Logging initialized; log file at {}", log_path.display());
    Ok(guard)
}

fn ensure_file_exists(path: &Path) -> Result<(), LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|source| LoggingError::CreateLogFile {
            path: path.to_path_buf(),
            source,
        })
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
