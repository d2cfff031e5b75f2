//! Logging infrastructure for TileProxy.
//!
//! Provides structured logging with file output and console output:
//! - Writes to `<log_dir>/tileproxy.log` (cleared on session start)
//! - Also prints to stdout for CLI tailing
//! - Timestamps in local time, RFC 3339
//! - `RUST_LOG` overrides the configured level; debug mode overrides both
//!
//! Request URLs for the tile origin carry access tokens in the query string,
//! so the proxy only ever logs URL paths.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;
use time::UtcOffset;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default log level when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
    log_path: PathBuf,
}

impl LoggingGuard {
    /// Path of the session log file.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

/// Initialize logging.
///
/// Creates the log directory if needed, clears the previous log file, and
/// installs a global subscriber writing to both the file and stdout.
///
/// `level` is an `EnvFilter` directive such as `info` or
/// `tileproxy=debug,info`. `RUST_LOG` takes precedence when set, unless
/// `debug_mode` is on, which forces `debug` regardless.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created, the log file
/// cannot be cleared, or a global subscriber is already installed.
pub fn init_logging(
    log_dir: &Path,
    log_file: &str,
    level: &str,
    debug_mode: bool,
) -> Result<LoggingGuard, io::Error> {
    let log_path = prepare_log_file(log_dir, log_file)?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    // Local offset lookup can fail on multi-threaded Unix processes.
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = OffsetTime::new(offset, Rfc3339);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_timer(timer.clone())
        .with_ansi(false)
        .with_target(true);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_timer(timer)
        .with_ansi(true)
        .compact();

    let filter = if debug_mode {
        EnvFilter::new("debug")
    } else {
        build_filter(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
        log_path,
    })
}

/// Create `log_dir` and truncate `log_file` inside it.
fn prepare_log_file(log_dir: &Path, log_file: &str) -> Result<PathBuf, io::Error> {
    fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(log_file);
    fs::write(&log_path, "")?;
    Ok(log_path)
}

/// `RUST_LOG` if set and valid, else `level`, else [`DEFAULT_LOG_LEVEL`].
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

/// Default log directory: `~/.tileproxy/logs`, or `./logs` without a home.
pub fn default_log_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".tileproxy").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Default log file name.
pub fn default_log_file() -> &'static str {
    "tileproxy.log"
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_paths() {
        assert_eq!(default_log_file(), "tileproxy.log");
        assert!(default_log_dir().ends_with("logs"));
    }

    #[test]
    fn test_prepare_creates_nested_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("deep").join("nested");

        let path = prepare_log_file(&dir, "test.log").unwrap();

        assert!(dir.exists());
        assert_eq!(path, dir.join("test.log"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_prepare_clears_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("test.log");
        fs::write(&path, "old log data").unwrap();

        prepare_log_file(temp.path(), "test.log").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_prepare_fails_when_directory_is_a_file() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        assert!(prepare_log_file(&blocker.join("logs"), "test.log").is_err());
    }

    #[test]
    fn test_build_filter_accepts_invalid_level() {
        // Falls back rather than panicking.
        let _ = build_filter("not a [valid directive");
        let _ = build_filter("tileproxy=debug,info");
    }
}
