//! # Logging
//!
//! The library crates only emit `tracing` events. The binary calls
//! [`init_logging`] once to send them to stderr, and to a rotating file if
//! one is configured.
//!
//!
//! ```no_run
//! use enclavekey::logging::{init_logging, LogConfig};
//!
//! let _guard = init_logging(&LogConfig::default()).expect("logging");
//! tracing::info!("started");
//! ```
//!
//! Private keys never reach a log line. Public key hex and signatures are
//! shortened with [`redact_sensitive`] first.
//!
//! ```
//! use enclavekey::logging::redact_sensitive;
//!
//! assert_eq!(redact_sensitive("04a1b2c3d4e5f60718"), "04a1***0718");
//! assert_eq!(redact_sensitive("short"), "***");
//! ```

use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Target used by [`log_security_event`].
pub const SECURITY_TARGET: &str = "enclavekey::security";

/// Failure to set up logging.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The log file location is unusable.
    #[error("cannot open log file: {0}")]
    FileCreation(String),

    /// Another global subscriber got there first.
    #[error("cannot install log subscriber: {0}")]
    SubscriberInit(String),

    /// Level or path rejected.
    #[error("bad log settings: {0}")]
    InvalidConfig(String),
}

/// Minimum severity that is logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Everything.
    Trace,
    /// Debug and above.
    Debug,
    /// Info and above.
    #[default]
    Info,
    /// Warnings and errors.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// The matching `tracing` level.
    #[must_use]
    pub const fn as_tracing_level(self) -> Level {
        match self {
            Self::Trace => Level::TRACE,
            Self::Debug => Level::DEBUG,
            Self::Info => Level::INFO,
            Self::Warn => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }

    /// Directive string for [`EnvFilter`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line human-readable output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
    /// Single-line human-readable output.
    Compact,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => f.write_str("pretty"),
            Self::Json => f.write_str("json"),
            Self::Compact => f.write_str("compact"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Minimum level.
    pub level: LogLevel,
    /// Output format.
    pub format: LogFormat,
    /// Also write to this file, rotated daily. The directory is created.
    pub file_path: Option<PathBuf>,
}

/// Hold this for the life of the process; dropping it flushes the log file.
pub struct LogGuard {
    guard: Option<WorkerGuard>,
}

impl LogGuard {
    const fn new(guard: Option<WorkerGuard>) -> Self {
        Self { guard }
    }
}

impl std::fmt::Debug for LogGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogGuard")
            .field("has_file_guard", &self.guard.is_some())
            .finish()
    }
}

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Install the global subscriber.
///
/// `RUST_LOG` is ignored; only `config.level` counts. With a `file_path`
/// every event is also appended to a daily-rotated file.
///
/// # Errors
///
/// Returns [`LogError`] if the log file cannot be created or a subscriber
/// is already installed.
pub fn init_logging(config: &LogConfig) -> Result<LogGuard, LogError> {
    let filter = EnvFilter::try_new(config.level.as_str())
        .map_err(|e| LogError::InvalidConfig(e.to_string()))?;

    let mut guard = None;
    let file_layer = match config.file_path.as_deref() {
        None => None,
        Some(path) => {
            let (writer, worker) = file_writer(path)?;
            guard = Some(worker);
            Some(file_layer(config.format, writer))
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer(config.format))
        .with(file_layer)
        .try_init()
        .map_err(|e| LogError::SubscriberInit(e.to_string()))?;

    Ok(LogGuard::new(guard))
}

fn console_layer<S>(format: LogFormat) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let base = fmt::layer().with_writer(std::io::stderr).with_target(true);
    match format {
        LogFormat::Pretty => base.pretty().boxed(),
        LogFormat::Compact => base.compact().boxed(),
        LogFormat::Json => base.json().with_current_span(true).boxed(),
    }
}

fn file_layer<S>(format: LogFormat, writer: NonBlocking) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let base = fmt::layer().with_writer(writer).with_target(true);
    if format == LogFormat::Json {
        base.json().boxed()
    } else {
        base.with_ansi(false).boxed()
    }
}

fn file_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard), LogError> {
    let name = path
        .file_name()
        .ok_or_else(|| LogError::InvalidConfig(format!("{} names no file", path.display())))?;
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    std::fs::create_dir_all(dir)
        .map_err(|e| LogError::FileCreation(format!("{}: {e}", dir.display())))?;

    Ok(tracing_appender::non_blocking(
        tracing_appender::rolling::daily(dir, name),
    ))
}

/// Shorten a value for logging: the first and last 4 characters survive.
///
/// Values under 12 characters are replaced by `***` entirely.
#[must_use]
pub fn redact_sensitive(value: &str) -> String {
    const KEEP: usize = 4;
    const SHORTEST_PARTIAL: usize = 12;

    let count = value.chars().count();
    if count < SHORTEST_PARTIAL {
        return String::from("***");
    }
    let head: String = value.chars().take(KEEP).collect();
    let tail: String = value.chars().skip(count - KEEP).collect();
    format!("{head}***{tail}")
}

/// Map `-v` occurrences to a level: none is warn, then info, debug, trace.
///
/// ```
/// use enclavekey::logging::{verbosity_to_level, LogLevel};
///
/// assert_eq!(verbosity_to_level(0), LogLevel::Warn);
/// assert_eq!(verbosity_to_level(2), LogLevel::Debug);
/// assert_eq!(verbosity_to_level(9), LogLevel::Trace);
/// ```
#[must_use]
pub const fn verbosity_to_level(verbosity: u8) -> LogLevel {
    match verbosity {
        0 => LogLevel::Warn,
        1 => LogLevel::Info,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    }
}

/// Record a key lifecycle or key use event under [`SECURITY_TARGET`].
pub fn log_security_event(event: &str, details: &str) {
    tracing::info!(
        target: SECURITY_TARGET,
        event,
        details,
        "security event"
    );
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_verbosity_to_level() {
        assert_eq!(verbosity_to_level(0), LogLevel::Warn);
        assert_eq!(verbosity_to_level(1), LogLevel::Info);
        assert_eq!(verbosity_to_level(2), LogLevel::Debug);
        assert_eq!(verbosity_to_level(3), LogLevel::Trace);
        assert_eq!(verbosity_to_level(255), LogLevel::Trace);
    }

    #[test]
    fn test_redact_public_key_hex() {
        let key_hex = format!("04{}", "ab".repeat(64));
        assert_eq!(redact_sensitive(&key_hex), "04ab***abab");
        assert_eq!(redact_sensitive("123456789012"), "1234***9012");
        assert_eq!(redact_sensitive("12345678901"), "***");
        assert_eq!(redact_sensitive(""), "***");
    }

    #[test]
    fn test_redact_multibyte() {
        assert_eq!(redact_sensitive("ключ-ключ-ключ"), "ключ***ключ");
    }

    #[test]
    fn test_level_strings() {
        for (level, name, tracing_level) in [
            (LogLevel::Trace, "trace", Level::TRACE),
            (LogLevel::Debug, "debug", Level::DEBUG),
            (LogLevel::Info, "info", Level::INFO),
            (LogLevel::Warn, "warn", Level::WARN),
            (LogLevel::Error, "error", Level::ERROR),
        ] {
            assert_eq!(level.as_str(), name);
            assert_eq!(level.to_string(), name);
            assert_eq!(level.as_tracing_level(), tracing_level);
        }
    }

    #[test]
    fn test_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.file_path.is_none());
        assert_eq!(LogFormat::Compact.to_string(), "compact");
    }

    #[test]
    fn test_log_error_display() {
        let err = LogError::SubscriberInit("already set".to_string());
        assert_eq!(err.to_string(), "cannot install log subscriber: already set");
    }

    #[test]
    fn test_log_guard_debug() {
        let debug = format!("{:?}", LogGuard::new(None));
        assert!(debug.contains("has_file_guard: false"));
    }
}
