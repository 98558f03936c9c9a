//! File logging. The terminal belongs to the UI, so nothing is ever written
//! to stdout or stderr once the app is running.
//!
//! `RUST_LOG` overrides the configured level, e.g. `RUST_LOG=kasongo=debug`.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    #[error("failed to open log file: {0}")]
    FileCreate(#[from] io::Error),

    #[error("failed to set global subscriber: {0}")]
    SetSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

pub fn env_filter(level: &str) -> Result<EnvFilter, LogError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).map_err(|e| LogError::InvalidLevel(format!("{level}: {e}"))),
    }
}

/// Install the global subscriber, appending to `path`.
pub fn init_logging(level: &str, path: &Path) -> Result<(), LogError> {
    let filter = env_filter(level)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_target(true)
            .with_ansi(false),
    );
    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!(log_level = %level, log_file = %path.display(), "logging initialized");
    Ok(())
}
