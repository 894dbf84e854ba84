//! Logging and tracing utilities

use anyhow::anyhow;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingConfig};

/// Initialize tracing with the default `info` level and compact output
pub fn init_tracing() -> anyhow::Result<()> {
    init_tracing_with(&LoggingConfig::default())
}

/// Initialize tracing with an explicit level and output format
///
/// `RUST_LOG` still takes precedence over `config.level`. Fails if a global
/// subscriber is already installed.
pub fn init_tracing_with(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    }
    .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}
