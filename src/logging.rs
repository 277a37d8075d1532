//! Tracing configuration and log routing.
//!
//! Logs go to stdout through a compact formatter and, when possible, to a file as well.
//! `DOCUSEEK_LOG_FILE` selects an explicit log file; otherwise `logs/docuseek.log` is used.
//! File output goes through a non-blocking writer so logging stays off the hot path.

use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Configure tracing subscribers for stdout and optional file logging.
///
/// Respects `RUST_LOG` for filtering and defaults to `info`. The worker guard for the
/// non-blocking file writer is parked in a global so it lives for the process lifetime.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    match file_writer() {
        Some(writer) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact();
            registry.with(file_layer).init();
        }
        None => registry.init(),
    }
}

fn log_file_path() -> PathBuf {
    std::env::var("DOCUSEEK_LOG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("logs/docuseek.log"))
}

/// Build a non-blocking writer for file logging.
///
/// Returns `None` when the log file (or its directory) cannot be created; the stdout layer
/// remains active either way.
fn file_writer() -> Option<NonBlocking> {
    let path = log_file_path();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(err) = fs::create_dir_all(parent)
    {
        eprintln!("Failed to create log directory {}: {err}", parent.display());
        return None;
    }

    match fs::OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);
            Some(non_blocking)
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}
