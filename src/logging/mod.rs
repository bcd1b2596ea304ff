//! Logging setup for the wallet and its CLI.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the binary (or any embedding application) through [`init_logging`].
//!
//! Secrets never reach a log line: key material, seeds, mnemonics and passwords
//! have redacted `Debug` impls and are never passed as fields.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use hdwallet_keystore::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! let config = LoggingConfig::from_env().with_format(LogFormat::Compact);
//! init_logging(&config);
//! ```

pub mod format;

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Once, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

pub use format::{CompactFormatter, WalletFormatter};

static INIT: Once = Once::new();
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Keeps the non-blocking file writer flushing for the life of the process.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_FILE_NAME: &str = "hdwallet.log";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `YYYY-MM-DD HH:MM:SS | LEVEL | target | message`
    #[default]
    Text,
    /// Newline-delimited JSON
    Json,
    /// `[LEVEL] message`
    Compact,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
            LogFormat::Compact => write!(f, "compact"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!(
                "Invalid log format '{}'. Valid options: text, json, compact",
                s
            )),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level DEBUG
    pub debug: bool,
    /// Minimum level TRACE (overrides `debug`)
    pub trace: bool,
    /// Also write a daily rolling file under `logging_dir`
    pub record_log: bool,
    /// Directory for log files (supports `~`)
    pub logging_dir: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            debug: false,
            trace: false,
            record_log: false,
            logging_dir: "~/.hdwallet/logs".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_file_logging(mut self, enabled: bool) -> Self {
        self.record_log = enabled;
        self
    }

    pub fn with_logging_dir(mut self, dir: impl Into<String>) -> Self {
        self.logging_dir = dir.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Load configuration from environment variables
    ///
    /// - `HDWALLET_LOG_FORMAT`: text, json or compact
    /// - `HDWALLET_LOG_DIR`: enables file logging into this directory
    /// - `HDWALLET_DEBUG`: debug level (any value)
    /// - `HDWALLET_TRACE`: trace level (any value)
    /// - `RUST_LOG`: standard filter, takes precedence over the level flags
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Overlay environment variables onto `self`.
    pub fn apply_env(mut self) -> Self {
        if std::env::var("HDWALLET_DEBUG").is_ok() || std::env::var("HDWALLET_TRACE").is_ok() {
            self.debug = true;
        }

        if std::env::var("HDWALLET_TRACE").is_ok() {
            self.trace = true;
        }

        if let Ok(format) = std::env::var("HDWALLET_LOG_FORMAT") {
            match format.parse() {
                Ok(f) => self.format = f,
                Err(e) => eprintln!("Warning: {e}"),
            }
        }

        if let Ok(dir) = std::env::var("HDWALLET_LOG_DIR") {
            self.logging_dir = dir;
            self.record_log = true;
        }

        self
    }

    fn level(&self) -> Level {
        if self.trace {
            Level::TRACE
        } else if self.debug {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }

    fn expand_path(&self) -> PathBuf {
        let path = &self.logging_dir;
        if let Some(stripped) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        }
        PathBuf::from(path)
    }
}

/// Install the global subscriber. Only the first call has any effect.
pub fn init_logging(config: &LoggingConfig) {
    INIT.call_once(|| {
        init_logging_internal(config);
        INITIALIZED.store(true, Ordering::SeqCst);
    });
}

/// INFO level, text format.
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}

pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::SeqCst)
}

fn format_layer<W>(format: LogFormat, writer: W, ansi: bool) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Text => fmt::layer()
            .event_format(WalletFormatter)
            .with_writer(writer)
            .with_ansi(ansi)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_ansi(false)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .event_format(CompactFormatter)
            .with_writer(writer)
            .with_ansi(ansi)
            .boxed(),
    }
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(format!("{},hyper=warn,reqwest=warn,h2=warn", config.level()))
    }
}

fn init_logging_internal(config: &LoggingConfig) {
    let mut layers = vec![format_layer(config.format, io::stderr, true)];

    if config.record_log {
        let log_dir = config.expand_path();
        match std::fs::create_dir_all(&log_dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME);
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                let _ = FILE_GUARD.set(guard);
                layers.push(format_layer(config.format, non_blocking, false));
            }
            Err(e) => eprintln!(
                "Warning: Failed to create log directory {:?}: {}",
                log_dir, e
            ),
        }
    }

    if let Err(e) = tracing_subscriber::registry()
        .with(layers)
        .with(env_filter(config))
        .try_init()
    {
        eprintln!("Warning: logging already initialized: {e}");
    }
}
