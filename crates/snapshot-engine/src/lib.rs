//! Indicator snapshot engine
//!
//! This crate assembles point-in-time indicator snapshots for equity symbols.
//! It includes:
//!
//! - Price indicators (RSI, MACD, Bollinger Bands, SMA/EMA, ATR, returns)
//! - Liquidity indicators from volume and the quoted spread
//! - Options indicators with per-call timeouts
//! - Value, quality, short interest, sentiment and corporate-action data
//!   from pluggable repositories
//! - A multi-tier TTL + LRU cache with one sub-cache per category
//! - Batch snapshots with bounded concurrency and progress reporting
//!
//! # Architecture
//!
//! [`SnapshotOrchestrator`] owns the collaborators, all injected as trait
//! objects (see [`providers`]):
//! - `MarketDataProvider`: bars and the latest quote
//! - `PriceCalculator` / `LiquidityCalculator` / `OptionsCalculator`
//! - Repositories for fundamentals, short interest, sentiment and
//!   corporate actions
//!
//! Every category is computed independently; a failing category yields
//! empty values instead of failing the snapshot.
//!
//! # Example
//!
//! ```rust,ignore
//! use snapshot_engine::{BatchOptions, SnapshotConfig, SnapshotOrchestrator, YahooMarketData};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SnapshotConfig::builder().batch_concurrency(4).build()?;
//!     let orchestrator = SnapshotOrchestrator::builder(Arc::new(YahooMarketData::new()))
//!         .config(config)
//!         .build()?;
//!
//!     let snapshot = orchestrator.get_snapshot("AAPL").await?;
//!     println!("{}", serde_json::to_string_pretty(&snapshot)?);
//!
//!     let batch = orchestrator
//!         .get_snapshots_batch(&["MSFT", "NVDA"], BatchOptions::new())
//!         .await;
//!     println!("{} failed", batch.metadata.failed);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod calculators;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod providers;
pub mod timeout;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use api::YahooMarketData;
pub use cache::{CacheCategory, CacheMetrics, CacheMetricsReport, MultiTierCache, TtlLruCache};
pub use config::{CacheConfig, CacheTtlConfig, SnapshotConfig, SnapshotConfigBuilder};
pub use engine::{
    BatchMetadata, BatchOptions, BatchProgress, BatchResult, ProgressCallback,
    SnapshotOrchestrator, SnapshotOrchestratorBuilder,
};
pub use error::{Result, SnapshotError};
pub use model::{DataQuality, Snapshot, normalize_symbol};
