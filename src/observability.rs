// SPDX-License-Identifier: Apache-2.0

//! Logging and observability helpers.

pub mod sensitive;

pub use sensitive::Sensitive;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "polyseed.log";
const LOG_RETENTION_DAYS: u64 = 14;
const DEFAULT_FILTER: &str = "polyseed=info,polyseed_lib=info";

/// Where log output goes.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Directory for the JSON daily log files. `None` keeps logging on stderr only.
    pub log_dir: Option<PathBuf>,
    /// Overrides `RUST_LOG` when set.
    pub filter: Option<String>,
}

/// Installs the global subscriber and the panic hook.
///
/// Human-readable output always goes to stderr so that query results on
/// stdout stay clean. The returned guard flushes the file writer on drop and
/// must be held until the process exits.
pub fn init_tracing(options: &LogOptions) -> Option<WorkerGuard> {
    let env_filter = match &options.filter {
        Some(filter) => EnvFilter::new(filter),
        None => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
        }
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .boxed();

    let mut guard = None;
    let file_layer = options.log_dir.as_deref().and_then(|log_dir| {
        if let Err(e) = fs::create_dir_all(log_dir) {
            eprintln!("Failed to create log directory {}: {}", log_dir.display(), e);
            return None;
        }

        if let Err(e) = cleanup_old_logs(log_dir, LOG_RETENTION_DAYS) {
            eprintln!("Failed to clean up old logs: {}", e);
        }

        let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
        let (writer, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);

        Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_current_span(true)
                .with_span_list(true)
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE)
                .boxed(),
        )
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    install_panic_hook();

    if let Some(log_dir) = &options.log_dir {
        tracing::debug!("Tracing initialized. Logs directory: {:?}", log_dir);
    }
    guard
}

fn install_panic_hook() {
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let payload = panic_info.payload();
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            format!("PANIC: {}", s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            format!("PANIC: {}", s)
        } else {
            "PANIC: unknown cause".to_string()
        };

        tracing::error!(target: "panic", location = %location, message = %msg, "polyseed panicked");

        previous_hook(panic_info);
    }));
}

/// Lists the rolled log files in `log_dir`, oldest first.
pub fn log_files(log_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with(LOG_FILE_PREFIX))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Removes rolled log files whose modification time is older than the retention window.
fn cleanup_old_logs(log_dir: &Path, retention_days: u64) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let retention = Duration::from_secs(retention_days * 24 * 60 * 60);
    let mut removed = 0;

    for path in log_files(log_dir)? {
        let Ok(modified) = fs::metadata(&path).and_then(|m| m.modified()) else {
            continue;
        };
        let Ok(age) = now.duration_since(modified) else {
            continue;
        };
        if age <= retention {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!("Failed to remove old log file {:?}: {}", path, e),
        }
    }
    Ok(removed)
}
