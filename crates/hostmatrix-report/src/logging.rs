//! Structured logging setup for hostmatrix front-ends.
//!
//! Terminal output is compact human-readable text on stderr, so stdout stays
//! free for reports. An optional JSON-lines file layer records every event with
//! its structured fields for post-hoc analysis with `jq`.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Guard returned by [`init_logging`]; keep it alive for the program's lifetime.
#[derive(Debug)]
pub struct LogGuard {
    /// Path of the JSON-lines log, when one was requested.
    pub log_path: Option<PathBuf>,
}

#[derive(Clone)]
struct SharedFileWriter {
    file: Arc<Mutex<File>>,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedFileWriter {
    type Writer = SharedFileGuard<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        SharedFileGuard {
            guard: self.file.lock(),
        }
    }
}

struct SharedFileGuard<'a> {
    guard: MutexGuard<'a, File>,
}

impl io::Write for SharedFileGuard<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut *self.guard, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(&mut *self.guard)
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "debug" } else { "warn" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber.
///
/// `verbose` lowers the default filter from `warn` to `debug`; `RUST_LOG`
/// overrides either. When `json_log` is given, events are also appended to
/// that file as JSON lines.
pub fn init_logging(verbose: bool, json_log: Option<&Path>) -> io::Result<LogGuard> {
    let terminal_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .compact();

    let json_layer = match json_log {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let writer = SharedFileWriter {
                file: Arc::new(Mutex::new(File::create(path)?)),
            };
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_target(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(terminal_layer)
        .with(json_layer)
        .try_init()
        .map_err(io::Error::other)?;

    Ok(LogGuard {
        log_path: json_log.map(Path::to_path_buf),
    })
}

/// Terminal-only logging for tests; safe to call from every test.
pub fn init_test_logging() {
    let _ = tracing_subscriber::registry()
        .with(env_filter(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_test_writer()
                .compact(),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_is_reentrant() {
        init_test_logging();
        init_test_logging();
        tracing::info!(case = "reentrant", "logging initialised twice");
    }
}
