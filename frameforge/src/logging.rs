//! Tracing subscriber setup.
//!
//! Installs one global subscriber made of:
//!
//! - an [`EnvFilter`] (`RUST_LOG` wins over the configured filter)
//! - a stderr `fmt` layer with local RFC 3339 timestamps
//! - an optional daily-rolling log file under [`LoggingConfig::directory`]
//! - a Chrome trace layer when built with the `profiling` feature
//!
//! Keep the returned [`LoggingGuard`] alive for the life of the process;
//! dropping it flushes and closes the file writers.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::UtcOffset;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// File name prefix for rolling log files.
pub const LOG_FILE_PREFIX: &str = "frameforge.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{filter}': {reason}")]
    Filter { filter: String, reason: String },

    #[error("failed to create log directory {}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Logging settings, usually read from the `[logging]` config section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `frameforge=debug`.
    pub filter: String,
    /// Directory for daily log files. `None` logs to stderr only.
    pub directory: Option<PathBuf>,
    /// Chrome trace output path. Only used with the `profiling` feature.
    pub chrome_trace: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            directory: None,
            chrome_trace: None,
        }
    }
}

impl LoggingConfig {
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }
}

/// Flushes buffered log output when dropped.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
    #[cfg(feature = "profiling")]
    _chrome: Option<tracing_chrome::FlushGuard>,
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if the filter does not parse, the log directory cannot be created,
/// or a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter).map_err(|e| LoggingError::Filter {
            filter: config.filter.clone(),
            reason: e.to_string(),
        })?,
    };

    let timer = OffsetTime::local_rfc_3339().unwrap_or_else(|_| OffsetTime::new(UtcOffset::UTC, Rfc3339));

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(timer.clone())
        .with_target(false);

    let (file_layer, file_guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::Directory {
                path: dir.clone(),
                source,
            })?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(timer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer);

    #[cfg(feature = "profiling")]
    {
        let mut builder = tracing_chrome::ChromeLayerBuilder::new().include_args(true);
        if let Some(path) = &config.chrome_trace {
            builder = builder.file(path);
        }
        let (chrome_layer, chrome_guard) = builder.build();
        registry
            .with(chrome_layer)
            .try_init()
            .map_err(|e| LoggingError::Init(e.to_string()))?;

        Ok(LoggingGuard {
            _file: file_guard,
            _chrome: Some(chrome_guard),
        })
    }

    #[cfg(not(feature = "profiling"))]
    {
        registry
            .try_init()
            .map_err(|e| LoggingError::Init(e.to_string()))?;

        Ok(LoggingGuard { _file: file_guard })
    }
}
