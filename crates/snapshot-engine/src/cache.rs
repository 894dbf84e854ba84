//! Multi-tier cache for snapshots and indicator categories
//!
//! Nine independent bounded caches, one per category plus one for full
//! snapshots. Each has its own TTL, evicts the least recently accessed entry
//! when full, and keeps hit/miss/eviction counters. Every sub-cache sits behind
//! its own mutex; operations are synchronous and never await.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::CacheConfig;
use crate::model::{
    CorporateIndicators, LiquidityIndicators, OptionsIndicators, PriceIndicators,
    QualityIndicators, SentimentIndicators, ShortInterestIndicators, Snapshot, ValueIndicators,
};

/// Identifies one of the nine sub-caches
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheCategory {
    Snapshot,
    Price,
    Liquidity,
    Options,
    Value,
    Quality,
    ShortInterest,
    Sentiment,
    Corporate,
}

impl CacheCategory {
    /// Stable name used in logs
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Price => "price",
            Self::Liquidity => "liquidity",
            Self::Options => "options",
            Self::Value => "value",
            Self::Quality => "quality",
            Self::ShortInterest => "short_interest",
            Self::Sentiment => "sentiment",
            Self::Corporate => "corporate",
        }
    }

    /// Sub-caches cleared on every market tick
    pub fn is_realtime(self) -> bool {
        matches!(
            self,
            Self::Snapshot | Self::Price | Self::Liquidity | Self::Options
        )
    }
}

/// A cached value with expiry and recency tracking
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at: Instant,
    pub last_accessed: Instant,
    // breaks ties between entries touched within the same clock tick
    seq: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// Counters for one cache (or the sum of all of them)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub hit_rate: f64,
}

impl CacheMetrics {
    fn new(hits: u64, misses: u64, evictions: u64, size: usize) -> Self {
        let accesses = hits + misses;
        let hit_rate = if accesses == 0 {
            0.0
        } else {
            hits as f64 / accesses as f64
        };
        Self {
            hits,
            misses,
            evictions,
            size,
            hit_rate,
        }
    }
}

/// Metrics for every sub-cache plus the aggregate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheMetricsReport {
    pub caches: BTreeMap<CacheCategory, CacheMetrics>,
    pub total: CacheMetrics,
}

struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    hits: u64,
    misses: u64,
    evictions: u64,
    seq: u64,
}

/// Bounded TTL cache with least-recently-accessed eviction
pub struct TtlLruCache<V> {
    category: CacheCategory,
    state: Mutex<CacheState<V>>,
    default_ttl: Duration,
    max_entries: usize,
    metrics_enabled: bool,
}

impl<V: Clone> TtlLruCache<V> {
    /// Create an empty cache
    pub fn new(
        category: CacheCategory,
        max_entries: usize,
        default_ttl: Duration,
        metrics_enabled: bool,
    ) -> Self {
        Self {
            category,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                hits: 0,
                misses: 0,
                evictions: 0,
                seq: 0,
            }),
            default_ttl,
            max_entries: max_entries.max(1),
            metrics_enabled,
        }
    }

    /// Which sub-cache this is
    pub fn category(&self) -> CacheCategory {
        self.category
    }

    /// Default TTL applied by [`set`](Self::set)
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Get a value, dropping it first if it has expired
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut state = self.state.lock();

        match state.entries.get(key).map(|entry| entry.is_expired(now)) {
            None => {
                self.record_miss(&mut state);
                return None;
            }
            Some(true) => {
                state.entries.remove(key);
                self.record_miss(&mut state);
                tracing::debug!(cache = self.category.as_str(), key, "Cache entry expired");
                return None;
            }
            Some(false) => {}
        }

        state.seq += 1;
        let seq = state.seq;
        if self.metrics_enabled {
            state.hits += 1;
        }
        let entry = state.entries.get_mut(key)?;
        entry.last_accessed = now;
        entry.seq = seq;
        Some(entry.value.clone())
    }

    /// Insert a value with the cache's default TTL
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Insert a value with an explicit TTL
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let now = Instant::now();
        let mut state = self.state.lock();

        if !state.entries.contains_key(&key) && state.entries.len() >= self.max_entries {
            self.evict_oldest(&mut state);
        }

        state.seq += 1;
        let seq = state.seq;
        state.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + ttl,
                last_accessed: now,
                seq,
            },
        );
    }

    /// Remove a key, returning whether it was present
    pub fn remove(&self, key: &str) -> bool {
        self.state.lock().entries.remove(key).is_some()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired(now));
        before - state.entries.len()
    }

    /// Drop every entry; counters are kept
    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    /// Number of stored entries, expired ones included until pruned or read
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of this cache's counters
    pub fn metrics(&self) -> CacheMetrics {
        let state = self.state.lock();
        CacheMetrics::new(state.hits, state.misses, state.evictions, state.entries.len())
    }

    fn record_miss(&self, state: &mut CacheState<V>) {
        if self.metrics_enabled {
            state.misses += 1;
        }
    }

    // Linear scan; fine at the default capacity of a few hundred entries.
    fn evict_oldest(&self, state: &mut CacheState<V>) {
        let oldest = state
            .entries
            .iter()
            .min_by_key(|(_, entry)| (entry.last_accessed, entry.seq))
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            state.entries.remove(&key);
            if self.metrics_enabled {
                state.evictions += 1;
            }
            tracing::debug!(cache = self.category.as_str(), key = %key, "Evicted LRU entry");
        }
    }
}

/// The nine sub-caches used by the snapshot orchestrator
pub struct MultiTierCache {
    /// Fully assembled snapshots
    pub snapshot: TtlLruCache<Snapshot>,
    pub price: TtlLruCache<PriceIndicators>,
    pub liquidity: TtlLruCache<LiquidityIndicators>,
    pub options: TtlLruCache<OptionsIndicators>,
    pub value: TtlLruCache<ValueIndicators>,
    pub quality: TtlLruCache<QualityIndicators>,
    pub short_interest: TtlLruCache<ShortInterestIndicators>,
    pub sentiment: TtlLruCache<SentimentIndicators>,
    pub corporate: TtlLruCache<CorporateIndicators>,
}

impl MultiTierCache {
    /// Create the cache from configuration
    pub fn new(config: &CacheConfig) -> Self {
        let ttl = &config.ttl;
        let max = config.max_entries;
        let metrics = config.enable_metrics;

        Self {
            snapshot: TtlLruCache::new(CacheCategory::Snapshot, max, ttl.snapshot, metrics),
            price: TtlLruCache::new(CacheCategory::Price, max, ttl.price, metrics),
            liquidity: TtlLruCache::new(CacheCategory::Liquidity, max, ttl.liquidity, metrics),
            options: TtlLruCache::new(CacheCategory::Options, max, ttl.options, metrics),
            value: TtlLruCache::new(CacheCategory::Value, max, ttl.fundamentals, metrics),
            quality: TtlLruCache::new(CacheCategory::Quality, max, ttl.fundamentals, metrics),
            short_interest: TtlLruCache::new(
                CacheCategory::ShortInterest,
                max,
                ttl.short_interest,
                metrics,
            ),
            sentiment: TtlLruCache::new(CacheCategory::Sentiment, max, ttl.sentiment, metrics),
            corporate: TtlLruCache::new(CacheCategory::Corporate, max, ttl.corporate, metrics),
        }
    }

    /// Create a cache with default configuration
    pub fn default_config() -> Self {
        Self::new(&CacheConfig::default())
    }

    /// Remove a symbol from every sub-cache
    ///
    /// Use when anything about the instrument changed, e.g. after a split.
    pub fn invalidate(&self, key: &str) {
        self.snapshot.remove(key);
        self.price.remove(key);
        self.liquidity.remove(key);
        self.options.remove(key);
        self.value.remove(key);
        self.quality.remove(key);
        self.short_interest.remove(key);
        self.sentiment.remove(key);
        self.corporate.remove(key);
        tracing::debug!(key, "Invalidated all cache tiers");
    }

    /// Remove a symbol from the realtime sub-caches only
    ///
    /// Fundamentals, sentiment, short interest and corporate data do not
    /// change intraday and are left in place.
    pub fn invalidate_realtime(&self, key: &str) {
        self.snapshot.remove(key);
        self.price.remove(key);
        self.liquidity.remove(key);
        self.options.remove(key);
        tracing::debug!(key, "Invalidated realtime cache tiers");
    }

    /// Sweep expired entries from every sub-cache
    pub fn prune(&self) -> usize {
        self.snapshot.prune()
            + self.price.prune()
            + self.liquidity.prune()
            + self.options.prune()
            + self.value.prune()
            + self.quality.prune()
            + self.short_interest.prune()
            + self.sentiment.prune()
            + self.corporate.prune()
    }

    /// Clear all caches
    pub fn clear(&self) {
        self.snapshot.clear();
        self.price.clear();
        self.liquidity.clear();
        self.options.clear();
        self.value.clear();
        self.quality.clear();
        self.short_interest.clear();
        self.sentiment.clear();
        self.corporate.clear();
    }

    /// Per-cache and aggregate metrics
    pub fn metrics(&self) -> CacheMetricsReport {
        let caches: BTreeMap<CacheCategory, CacheMetrics> = [
            (CacheCategory::Snapshot, self.snapshot.metrics()),
            (CacheCategory::Price, self.price.metrics()),
            (CacheCategory::Liquidity, self.liquidity.metrics()),
            (CacheCategory::Options, self.options.metrics()),
            (CacheCategory::Value, self.value.metrics()),
            (CacheCategory::Quality, self.quality.metrics()),
            (CacheCategory::ShortInterest, self.short_interest.metrics()),
            (CacheCategory::Sentiment, self.sentiment.metrics()),
            (CacheCategory::Corporate, self.corporate.metrics()),
        ]
        .into_iter()
        .collect();

        let (hits, misses, evictions, size) = caches.values().fold(
            (0, 0, 0, 0),
            |(hits, misses, evictions, size), m| {
                (
                    hits + m.hits,
                    misses + m.misses,
                    evictions + m.evictions,
                    size + m.size,
                )
            },
        );

        CacheMetricsReport {
            caches,
            total: CacheMetrics::new(hits, misses, evictions, size),
        }
    }

    /// Prune expired entries on a fixed interval in the background
    ///
    /// Not needed for correctness since reads drop expired entries; it only
    /// bounds memory held by keys that are never read again.
    pub fn spawn_pruner(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = cache.prune();
                if removed > 0 {
                    tracing::debug!(removed, "Pruned expired cache entries");
                }
            }
        })
    }
}

impl Default for MultiTierCache {
    fn default() -> Self {
        Self::default_config()
    }
}
