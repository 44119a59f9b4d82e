//! # pe-observability
//!
//! Structured logging for Password Enhancements, built on `tracing`.

pub mod logging;

pub use logging::{init_logging, init_logging_with_config, LogFormat, LoggingConfig, LoggingError};
