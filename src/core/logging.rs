//! Tracing setup: `RUST_LOG`-driven filtering to stdout and a daily-rolling file.

use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::AppPaths;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const DEFAULT_DIRECTIVES: &str = "info,tourguide_backend=debug,tower_http=info";
const LOG_FILE_NAME: &str = "tourguide.log";

/// Filter from `RUST_LOG`, or the service defaults when it is unset or invalid.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Installs stdout and file output.
///
/// Returns `false` when a global subscriber was already installed; the existing one is kept
/// and this call's file writer is dropped.
pub fn init(paths: &AppPaths) -> bool {
    let log_dir = &paths.log_dir;
    if let Err(err) = std::fs::create_dir_all(log_dir) {
        eprintln!("Failed to create log directory {}: {}", log_dir.display(), err);
    }

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(non_blocking);

    match tracing_subscriber::registry()
        .with(env_filter())
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
    {
        Ok(()) => {
            let _ = LOG_GUARD.set(guard);
            tracing::debug!(log_dir = %log_dir.display(), "Logging initialized");
            true
        }
        Err(err) => {
            tracing::debug!("Logging already initialized, keeping existing subscriber: {}", err);
            false
        }
    }
}
