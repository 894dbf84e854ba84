//! Configuration for the snapshot service and its cache

use crate::error::{Result, SnapshotError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Time-to-live per cache family
///
/// Ordered by how quickly the underlying source changes: realtime-derived
/// values expire first, cross-sectional batch data last. [`CacheTtlConfig::validate`]
/// rejects configurations that break this ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheTtlConfig {
    /// Full snapshots
    pub snapshot: Duration,
    /// Price indicators
    pub price: Duration,
    /// Liquidity indicators
    pub liquidity: Duration,
    /// Options indicators
    pub options: Duration,
    /// Value and quality indicators
    pub fundamentals: Duration,
    /// Sentiment indicators
    pub sentiment: Duration,
    /// Short interest indicators
    pub short_interest: Duration,
    /// Corporate action indicators
    pub corporate: Duration,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            snapshot: Duration::from_secs(60),
            price: Duration::from_secs(30),
            liquidity: Duration::from_secs(30),
            options: Duration::from_secs(60),
            fundamentals: Duration::from_secs(300),
            sentiment: Duration::from_secs(300),
            short_interest: Duration::from_secs(300),
            corporate: Duration::from_secs(300),
        }
    }
}

impl CacheTtlConfig {
    /// Check the volatility ordering: realtime <= options <= batch
    pub fn validate(&self) -> Result<()> {
        let realtime = self.price.max(self.liquidity);
        let batch = self
            .fundamentals
            .min(self.sentiment)
            .min(self.short_interest)
            .min(self.corporate);

        if realtime > self.options {
            return Err(SnapshotError::Config(format!(
                "realtime TTL ({realtime:?}) must not exceed options TTL ({:?})",
                self.options
            )));
        }
        if self.options > batch {
            return Err(SnapshotError::Config(format!(
                "options TTL ({:?}) must not exceed batch TTL ({batch:?})",
                self.options
            )));
        }
        Ok(())
    }
}

/// Configuration for [`MultiTierCache`](crate::cache::MultiTierCache)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Capacity of each sub-cache
    pub max_entries: usize,
    /// Default TTL per sub-cache
    pub ttl: CacheTtlConfig,
    /// Track hit/miss/eviction counters
    pub enable_metrics: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 500,
            ttl: CacheTtlConfig::default(),
            enable_metrics: true,
        }
    }
}

impl CacheConfig {
    /// Validate the cache configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(SnapshotError::Config(
                "max_entries must be greater than 0".to_string(),
            ));
        }
        self.ttl.validate()
    }
}

/// Configuration for snapshot retrieval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Number of daily bars requested from the market data provider
    pub bars_lookback: usize,

    /// Query the repository-backed categories
    pub include_batch_indicators: bool,

    /// Query the options provider
    pub include_options_indicators: bool,

    /// Read and write the multi-tier cache
    pub enable_cache: bool,

    /// Skip cache reads by default (writes still happen)
    pub bypass_cache: bool,

    /// Default number of concurrent fetches per batch chunk
    pub batch_concurrency: usize,

    /// Optional deadline for each category computation
    pub category_timeout: Option<Duration>,

    /// Cache settings
    pub cache: CacheConfig,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            bars_lookback: 200,
            include_batch_indicators: true,
            include_options_indicators: true,
            enable_cache: true,
            bypass_cache: false,
            batch_concurrency: 5,
            category_timeout: None,
            cache: CacheConfig::default(),
        }
    }
}

impl SnapshotConfig {
    /// Create a new configuration builder
    pub fn builder() -> SnapshotConfigBuilder {
        SnapshotConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.bars_lookback == 0 {
            return Err(SnapshotError::Config(
                "bars_lookback must be greater than 0".to_string(),
            ));
        }

        if self.batch_concurrency == 0 {
            return Err(SnapshotError::Config(
                "batch_concurrency must be greater than 0".to_string(),
            ));
        }

        if self.category_timeout == Some(Duration::ZERO) {
            return Err(SnapshotError::Config(
                "category_timeout must be non-zero when set".to_string(),
            ));
        }

        self.cache.validate()
    }
}

/// Builder for SnapshotConfig
#[derive(Debug, Default)]
pub struct SnapshotConfigBuilder {
    bars_lookback: Option<usize>,
    include_batch_indicators: Option<bool>,
    include_options_indicators: Option<bool>,
    enable_cache: Option<bool>,
    bypass_cache: Option<bool>,
    batch_concurrency: Option<usize>,
    category_timeout: Option<Duration>,
    max_entries: Option<usize>,
    ttl: Option<CacheTtlConfig>,
    enable_metrics: Option<bool>,
}

impl SnapshotConfigBuilder {
    /// Set the bar lookback
    pub fn bars_lookback(mut self, bars: usize) -> Self {
        self.bars_lookback = Some(bars);
        self
    }

    /// Enable or disable repository-backed categories
    pub fn include_batch_indicators(mut self, include: bool) -> Self {
        self.include_batch_indicators = Some(include);
        self
    }

    /// Enable or disable the options category
    pub fn include_options_indicators(mut self, include: bool) -> Self {
        self.include_options_indicators = Some(include);
        self
    }

    /// Enable or disable caching entirely
    pub fn enable_cache(mut self, enable: bool) -> Self {
        self.enable_cache = Some(enable);
        self
    }

    /// Skip cache reads by default
    pub fn bypass_cache(mut self, bypass: bool) -> Self {
        self.bypass_cache = Some(bypass);
        self
    }

    /// Set default batch concurrency
    pub fn batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = Some(concurrency);
        self
    }

    /// Bound each category computation
    pub fn category_timeout(mut self, timeout: Duration) -> Self {
        self.category_timeout = Some(timeout);
        self
    }

    /// Set the capacity of each sub-cache
    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Replace the TTL table
    pub fn ttl(mut self, ttl: CacheTtlConfig) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Enable or disable cache metrics
    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = Some(enable);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<SnapshotConfig> {
        let defaults = SnapshotConfig::default();

        let config = SnapshotConfig {
            bars_lookback: self.bars_lookback.unwrap_or(defaults.bars_lookback),
            include_batch_indicators: self
                .include_batch_indicators
                .unwrap_or(defaults.include_batch_indicators),
            include_options_indicators: self
                .include_options_indicators
                .unwrap_or(defaults.include_options_indicators),
            enable_cache: self.enable_cache.unwrap_or(defaults.enable_cache),
            bypass_cache: self.bypass_cache.unwrap_or(defaults.bypass_cache),
            batch_concurrency: self.batch_concurrency.unwrap_or(defaults.batch_concurrency),
            category_timeout: self.category_timeout.or(defaults.category_timeout),
            cache: CacheConfig {
                max_entries: self.max_entries.unwrap_or(defaults.cache.max_entries),
                ttl: self.ttl.unwrap_or(defaults.cache.ttl),
                enable_metrics: self.enable_metrics.unwrap_or(defaults.cache.enable_metrics),
            },
        };

        config.validate()?;
        Ok(config)
    }
}
