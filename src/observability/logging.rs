//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber (text or JSON)
//! - Provide the NOTICE and FATAL levels tracing lacks
//! - Configure log level from config, overridable by `RUST_LOG`
//!
//! # Design Decisions
//! - NOTICE is emitted at INFO and FATAL at ERROR, each tagged with a
//!   `severity` field carrying its label
//! - A `notice` or `fatal` threshold is enforced on that field, so plain
//!   INFO (or ERROR) lines are dropped
//! - `fatal!` exits the process with status 1 right after logging

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::field::{Field, Visit};
use tracing::{Event, Metadata};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::layer::{Context, Filter, Layer, SubscriberExt};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Log levels, ordered by severity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    #[default]
    Info,
    Notice,
    Warning,
    Error,
    Fatal,
}

impl Level {
    const ALL: [Level; 7] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Notice,
        Level::Warning,
        Level::Error,
        Level::Fatal,
    ];

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.label() == label)
    }

    fn from_tracing(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warning,
            tracing::Level::ERROR => Level::Error,
        }
    }

    /// Numeric severity; gaps leave room between the named levels.
    pub fn severity(self) -> i8 {
        match self {
            Level::Trace => -8,
            Level::Debug => -4,
            Level::Info => 0,
            Level::Notice => 2,
            Level::Warning => 4,
            Level::Error => 8,
            Level::Fatal => 12,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Notice => "NOTICE",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }

    /// Closest tracing filter that lets this level through.
    pub fn filter(self) -> LevelFilter {
        match self {
            Level::Trace => LevelFilter::TRACE,
            Level::Debug => LevelFilter::DEBUG,
            Level::Info | Level::Notice => LevelFilter::INFO,
            Level::Warning => LevelFilter::WARN,
            Level::Error | Level::Fatal => LevelFilter::ERROR,
        }
    }
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Minimum level emitted.
    pub level: Level,

    /// Text for development, JSON for production.
    pub format: LogFormat,

    /// Include source file and line in each event.
    pub add_source: bool,
}

/// Drops events below a NOTICE or FATAL threshold.
///
/// An event's level is its `severity` field when present, else its tracing
/// level. Other thresholds pass everything and leave filtering to `EnvFilter`.
#[derive(Debug, Clone, Copy)]
pub struct SeverityFilter {
    threshold: Level,
}

impl SeverityFilter {
    pub fn new(level: Level) -> Self {
        let threshold = match level {
            Level::Notice | Level::Fatal => level,
            _ => Level::Trace,
        };
        Self { threshold }
    }
}

impl<S> Filter<S> for SeverityFilter {
    fn enabled(&self, _meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        true
    }

    fn event_enabled(&self, event: &Event<'_>, _cx: &Context<'_, S>) -> bool {
        if self.threshold == Level::Trace {
            return true;
        }
        let mut severity = SeverityField(None);
        event.record(&mut severity);
        let level = severity
            .0
            .unwrap_or_else(|| Level::from_tracing(event.metadata().level()));
        level >= self.threshold
    }
}

struct SeverityField(Option<Level>);

impl Visit for SeverityField {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "severity" {
            self.0 = Level::from_label(value);
        }
    }

    fn record_debug(&mut self, _field: &Field, _value: &dyn fmt::Debug) {}
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to install log subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Install the global subscriber.
pub fn init(config: &LoggerConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::builder()
        .with_default_directive(config.level.filter().into())
        .from_env_lossy();
    let severity = SeverityFilter::new(config.level);
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_file(config.add_source)
                    .with_line_number(config.add_source)
                    .with_filter(severity),
            )
            .try_init()?,
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_file(config.add_source)
                    .with_line_number(config.add_source)
                    .with_filter(severity),
            )
            .try_init()?,
    }

    tracing::debug!(level = config.level.label(), format = ?config.format, "logging initialized");
    Ok(())
}

/// Log at NOTICE: above INFO, below WARNING.
#[macro_export]
macro_rules! notice {
    ($($arg:tt)+) => {
        ::tracing::info!(
            severity = $crate::observability::logging::Level::Notice.label(),
            $($arg)+
        )
    };
}

/// Log at FATAL, then exit the process with status 1.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)+) => {{
        ::tracing::error!(
            severity = $crate::observability::logging::Level::Fatal.label(),
            $($arg)+
        );
        ::std::process::exit(1)
    }};
}
