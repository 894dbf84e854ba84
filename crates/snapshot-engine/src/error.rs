//! Error types for snapshot operations

use thiserror::Error;

/// Snapshot service errors
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Symbol was empty after normalization
    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    /// Market data provider failed (bars or quote)
    #[error("Market data error for {symbol}: {reason}")]
    MarketData {
        symbol: String,
        reason: String,
    },

    /// Options data provider failed
    #[error("Options provider error: {0}")]
    Provider(String),

    /// Persistence repository lookup failed
    #[error("Repository error ({repository}): {reason}")]
    Repository {
        repository: &'static str,
        reason: String,
    },

    /// An operation exceeded its deadline
    #[error("Timed out after {millis}ms: {operation}")]
    Timeout {
        operation: String,
        millis: u128,
    },

    /// A spawned category task panicked or was cancelled
    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Unexpected failure escaping the per-category isolation
    #[error("Snapshot pipeline failed for {symbol}: {reason}")]
    Pipeline {
        symbol: String,
        reason: String,
    },

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinance(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl SnapshotError {
    /// Shorthand for a repository failure
    pub fn repository(repository: &'static str, reason: impl Into<String>) -> Self {
        Self::Repository {
            repository,
            reason: reason.into(),
        }
    }

    /// Shorthand for a market data failure
    pub fn market_data(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MarketData {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for snapshot operations
pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Convert anyhow::Error from collaborator adapters
impl From<anyhow::Error> for SnapshotError {
    fn from(err: anyhow::Error) -> Self {
        SnapshotError::Other(err.to_string())
    }
}
