//! Shared logging setup for Grantflow binaries.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "grantflow=info,grantflow_workflow=info";
const HOME_ENV: &str = "GRANTFLOW_HOME";
const HOME_DIR_NAME: &str = ".grantflow";

/// Logging configuration shared by Grantflow binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
    /// Keep stderr quiet (warnings only) so machine-readable stdout stays clean.
    pub json_output: bool,
}

/// Initialize tracing with a daily rolling file and a stderr layer.
///
/// The returned guard flushes the file writer on drop; hold it for the
/// lifetime of the process. When the log directory cannot be created the
/// file layer is skipped and only stderr is used.
pub fn init_logging(config: LogConfig<'_>) -> Result<Option<WorkerGuard>> {
    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console_filter = if config.verbose {
        file_filter.clone()
    } else if config.json_output {
        EnvFilter::new("warn")
    } else {
        EnvFilter::new("warn,grantflow=info")
    };

    let mut guard = None;
    let file_layer = match ensure_logs_dir() {
        Ok(dir) => {
            let appender =
                tracing_appender::rolling::daily(dir, format!("{}.log", sanitize_name(config.app_name)));
            let (writer, worker_guard) = tracing_appender::non_blocking(appender);
            guard = Some(worker_guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(file_filter),
            )
        }
        Err(err) => {
            eprintln!("Warning: file logging disabled: {:#}", err);
            None
        }
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

/// Get the Grantflow home directory: `$GRANTFLOW_HOME` or `~/.grantflow`.
pub fn grantflow_home() -> Result<PathBuf> {
    resolve_home(std::env::var(HOME_ENV).ok(), dirs::home_dir())
}

fn resolve_home(override_path: Option<String>, home: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = override_path.filter(|p| !p.trim().is_empty()) {
        return Ok(PathBuf::from(path));
    }
    home.map(|h| h.join(HOME_DIR_NAME))
        .context("Could not determine home directory; set GRANTFLOW_HOME")
}

/// Get the logs directory: `<home>/logs`
pub fn logs_dir() -> Result<PathBuf> {
    Ok(grantflow_home()?.join("logs"))
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir()?;
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}
