//! Shared utilities for the snapshot workspace
//!
//! Logging setup and its configuration, used by the binaries.

pub mod config;
pub mod logging;

pub use config::{LogFormat, LoggingConfig, ParseLogFormatError};
pub use logging::{init_tracing, init_tracing_with};
