use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt};

/// Keeps the non-blocking log writer alive for the lifetime of the run.
pub struct LoggingGuard {
    _guard: Option<WorkerGuard>,
}

/// Human-readable logs on stderr by default; structured JSONL to a file when
/// `json_log` is given. `RUST_LOG` overrides the verbosity either way.
pub fn init_logging(verbose: bool, json_log: Option<&Path>) -> Result<LoggingGuard> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match json_log {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file at {}", path.display()))?;
            let (writer, guard) = non_blocking::NonBlockingBuilder::default()
                .lossy(false)
                .finish(file);
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(filter)
                .json()
                .with_writer(writer)
                .finish();
            // Ignore error if a global subscriber is already set (e.g., when running in tests)
            let _ = tracing::subscriber::set_global_default(subscriber);
            Ok(LoggingGuard {
                _guard: Some(guard),
            })
        }
        None => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            let _ = tracing::subscriber::set_global_default(subscriber);
            Ok(LoggingGuard { _guard: None })
        }
    }
}
