//! Logging infrastructure.
//!
//! `RUST_LOG` takes precedence over the configured level when set.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Crates whose events are enabled at the configured level.
const LOG_TARGETS: &[&str] = &["pe_core", "pe_api", "pe_cli", "tower_http"];

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("A global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Unknown log format '{}'", other)),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level.
    pub level: Level,
    /// Output format.
    pub format: LogFormat,
    /// Whether to include span open/close events.
    pub include_spans: bool,
    /// Whether to include file/line info.
    pub include_location: bool,
    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Text,
            include_spans: false,
            include_location: true,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// Creates a development configuration with more verbose output.
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Text,
            include_spans: true,
            include_location: true,
            include_target: true,
        }
    }

    /// Creates a production configuration with JSON output.
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Json,
            include_spans: false,
            include_location: false,
            include_target: true,
        }
    }

    /// Builds a configuration from textual level and format settings.
    pub fn from_settings(level: &str, format: LogFormat) -> Result<Self, LoggingError> {
        let level = Level::from_str(level)
            .map_err(|_| LoggingError::Filter(format!("Unknown log level '{}'", level)))?;

        let base = match format {
            LogFormat::Json => Self::production(),
            LogFormat::Text => Self::default(),
        };
        Ok(Self { level, ..base })
    }

    /// Default filter directives for this configuration.
    pub fn filter_directives(&self) -> String {
        LOG_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, self.level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Initializes the logging system with default configuration.
pub fn init_logging() -> Result<(), LoggingError> {
    init_logging_with_config(LoggingConfig::default())
}

/// Initializes the logging system with the given configuration.
pub fn init_logging_with_config(config: LoggingConfig) -> Result<(), LoggingError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.filter_directives())
            .map_err(|e| LoggingError::Filter(e.to_string()))?,
    };

    let span_events = if config.include_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let result = match config.format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_span_events(span_events)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()
        }
        LogFormat::Text => {
            let fmt_layer = fmt::layer()
                .with_span_events(span_events)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()
        }
    };

    result.map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}
