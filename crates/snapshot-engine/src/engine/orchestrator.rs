//! Snapshot orchestrator
//!
//! Assembles one [`Snapshot`] per symbol:
//!
//! 1. serve from the snapshot cache when allowed
//! 2. fetch bars and the quote concurrently
//! 3. run every indicator category as its own task and wait for all of them
//! 4. merge the results, grade data quality and write back to the cache
//!
//! A failing category never fails the snapshot; it contributes its empty
//! value and a warning. Only an invalid symbol or a panic escaping the
//! pipeline is reported as an error.

use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::categories::{self, Computed, settle, spawn_category};
use super::quality;
use crate::cache::{CacheMetricsReport, MultiTierCache};
use crate::calculators::{BarLiquidityCalculator, TaPriceCalculator, TimeoutOptionsCalculator};
use crate::config::SnapshotConfig;
use crate::error::{Result, SnapshotError};
use crate::model::{
    Bar, CorporateIndicators, LiquidityIndicators, MarketContext, OptionsIndicators,
    PriceIndicators, QualityIndicators, Quote, SentimentIndicators, ShortInterestIndicators,
    Snapshot, SnapshotMetadata, ValueIndicators, normalize_symbol,
};
use crate::providers::{
    CorporateActionsRepository, FundamentalsRepository, LiquidityCalculator, MarketDataProvider,
    OptionsCalculator, OptionsDataProvider, PriceCalculator, SentimentRepository,
    ShortInterestRepository,
};

/// Builds indicator snapshots from injected collaborators
pub struct SnapshotOrchestrator {
    config: SnapshotConfig,
    cache: Arc<MultiTierCache>,
    market_data: Arc<dyn MarketDataProvider>,
    options_provider: Option<Arc<dyn OptionsDataProvider>>,
    price_calculator: Arc<dyn PriceCalculator>,
    liquidity_calculator: Arc<dyn LiquidityCalculator>,
    options_calculator: Arc<dyn OptionsCalculator>,
    fundamentals: Option<Arc<dyn FundamentalsRepository>>,
    short_interest: Option<Arc<dyn ShortInterestRepository>>,
    sentiment: Option<Arc<dyn SentimentRepository>>,
    corporate_actions: Option<Arc<dyn CorporateActionsRepository>>,
}

/// Category values gathered for one snapshot
struct Categories {
    price: Computed<PriceIndicators>,
    liquidity: Computed<LiquidityIndicators>,
    options: Computed<OptionsIndicators>,
    fundamentals: Computed<(ValueIndicators, QualityIndicators)>,
    short_interest: Computed<ShortInterestIndicators>,
    sentiment: Computed<SentimentIndicators>,
    corporate: Computed<CorporateIndicators>,
}

impl SnapshotOrchestrator {
    pub fn builder(market_data: Arc<dyn MarketDataProvider>) -> SnapshotOrchestratorBuilder {
        SnapshotOrchestratorBuilder::new(market_data)
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Shared cache handle, e.g. for [`MultiTierCache::spawn_pruner`]
    pub fn cache(&self) -> &Arc<MultiTierCache> {
        &self.cache
    }

    /// Snapshot for `symbol`, honouring the configured bypass flag
    pub async fn get_snapshot(&self, symbol: &str) -> Result<Snapshot> {
        self.snapshot_with(symbol, self.config.bypass_cache).await
    }

    /// Snapshot for `symbol` without reading any cache
    ///
    /// The fresh result is still written back when caching is enabled.
    pub async fn get_snapshot_bypass(&self, symbol: &str) -> Result<Snapshot> {
        self.snapshot_with(symbol, true).await
    }

    pub(crate) async fn snapshot_with(&self, symbol: &str, bypass: bool) -> Result<Snapshot> {
        let symbol = validate_symbol(symbol)?;
        let read_cache = self.reads_cache(bypass);

        if read_cache {
            if let Some(snapshot) = self.cache.snapshot.get(&symbol) {
                debug!(symbol = %symbol, "Snapshot cache hit");
                return Ok(snapshot);
            }
            debug!(symbol = %symbol, "Snapshot cache miss");
        }

        AssertUnwindSafe(self.assemble(&symbol, read_cache))
            .catch_unwind()
            .await
            .map_err(|panic| {
                let reason = panic_reason(panic.as_ref());
                error!(symbol = %symbol, reason = %reason, "Snapshot pipeline failed");
                SnapshotError::Pipeline {
                    symbol: symbol.clone(),
                    reason,
                }
            })
    }

    /// Price indicators only, through the price sub-cache
    pub async fn get_price_indicators(&self, symbol: &str) -> Result<PriceIndicators> {
        let symbol = validate_symbol(symbol)?;
        if self.reads_cache(self.config.bypass_cache) {
            if let Some(hit) = self.cache.price.get(&symbol) {
                return Ok(hit);
            }
        }

        let bars = self
            .market_data
            .get_bars(&symbol, self.config.bars_lookback)
            .await?;
        let price = self.price_calculator.calculate(&bars);

        if self.config.enable_cache && !bars.is_empty() {
            self.cache.price.set(symbol, price.clone());
        }
        Ok(price)
    }

    /// Liquidity indicators only, through the liquidity sub-cache
    pub async fn get_liquidity_indicators(&self, symbol: &str) -> Result<LiquidityIndicators> {
        let symbol = validate_symbol(symbol)?;
        if self.reads_cache(self.config.bypass_cache) {
            if let Some(hit) = self.cache.liquidity.get(&symbol) {
                return Ok(hit);
            }
        }

        let (bars, quote) = tokio::join!(
            self.market_data.get_bars(&symbol, self.config.bars_lookback),
            self.market_data.get_quote(&symbol),
        );
        let (bars, quote) = (bars?, quote?);
        let liquidity = self.liquidity_calculator.calculate(&bars, quote.as_ref());

        if self.config.enable_cache && (!bars.is_empty() || quote.is_some()) {
            self.cache.liquidity.set(symbol, liquidity.clone());
        }
        Ok(liquidity)
    }

    /// Options indicators only, through the options sub-cache
    ///
    /// Empty when options are disabled or no provider is configured.
    pub async fn get_options_indicators(&self, symbol: &str) -> Result<OptionsIndicators> {
        let symbol = validate_symbol(symbol)?;
        let Some(provider) = self.active_options_provider() else {
            return Ok(OptionsIndicators::default());
        };
        if self.reads_cache(self.config.bypass_cache) {
            if let Some(hit) = self.cache.options.get(&symbol) {
                return Ok(hit);
            }
        }

        let options = self
            .options_calculator
            .calculate(&symbol, provider.as_ref())
            .await?;

        if self.config.enable_cache {
            self.cache.options.set(symbol, options.clone());
        }
        Ok(options)
    }

    /// Drop every cached entry for `symbol`
    pub fn invalidate_cache(&self, symbol: &str) {
        let symbol = normalize_symbol(symbol);
        self.cache.invalidate(&symbol);
        info!(symbol = %symbol, "Invalidated cached data");
    }

    /// Drop the snapshot and realtime entries for `symbol`
    pub fn invalidate_realtime_cache(&self, symbol: &str) {
        let symbol = normalize_symbol(symbol);
        self.cache.invalidate_realtime(&symbol);
        debug!(symbol = %symbol, "Invalidated realtime cached data");
    }

    pub fn cache_metrics(&self) -> CacheMetricsReport {
        self.cache.metrics()
    }

    fn reads_cache(&self, bypass: bool) -> bool {
        self.config.enable_cache && !bypass
    }

    fn active_options_provider(&self) -> Option<Arc<dyn OptionsDataProvider>> {
        self.options_provider
            .clone()
            .filter(|_| self.config.include_options_indicators)
    }

    async fn fetch_market_data(&self, symbol: &str) -> (Vec<Bar>, Option<Quote>) {
        let (bars, quote) = tokio::join!(
            self.market_data.get_bars(symbol, self.config.bars_lookback),
            self.market_data.get_quote(symbol),
        );

        let bars = bars.unwrap_or_else(|e| {
            warn!(symbol, error = %e, "Bars unavailable, continuing without price history");
            Vec::new()
        });
        let quote = quote.unwrap_or_else(|e| {
            warn!(symbol, error = %e, "Quote unavailable, continuing without it");
            None
        });
        (bars, quote)
    }

    async fn assemble(&self, symbol: &str, read_cache: bool) -> Snapshot {
        let (bars, quote) = self.fetch_market_data(symbol).await;
        debug!(symbol, bars = bars.len(), has_quote = quote.is_some(), "Market data fetched");

        let bars = Arc::new(bars);
        let quote = Arc::new(quote);
        let deadline = self.config.category_timeout;
        let include_batch = self.config.include_batch_indicators;
        let batch_cache = Some(Arc::clone(&self.cache)).filter(|_| read_cache && include_batch);

        let price_task = {
            let calculator = Arc::clone(&self.price_calculator);
            let bars = Arc::clone(&bars);
            spawn_category("price", deadline, async move {
                if bars.is_empty() {
                    return Ok(Computed::unavailable());
                }
                Ok(Computed::fresh(calculator.calculate(&bars)))
            })
        };

        let liquidity_task = {
            let calculator = Arc::clone(&self.liquidity_calculator);
            let bars = Arc::clone(&bars);
            let quote = Arc::clone(&quote);
            spawn_category("liquidity", deadline, async move {
                if bars.is_empty() && quote.is_none() {
                    return Ok(Computed::unavailable());
                }
                Ok(Computed::fresh(calculator.calculate(&bars, (*quote).as_ref())))
            })
        };

        let options_task = spawn_category(
            "options",
            deadline,
            categories::options(
                Arc::clone(&self.options_calculator),
                self.active_options_provider(),
                symbol.to_string(),
            ),
        );

        let fundamentals_task = spawn_category(
            "fundamentals",
            deadline,
            categories::fundamentals(
                self.fundamentals.clone().filter(|_| include_batch),
                batch_cache.clone(),
                symbol.to_string(),
            ),
        );

        let short_interest_task = spawn_category(
            "short_interest",
            deadline,
            categories::short_interest(
                self.short_interest.clone().filter(|_| include_batch),
                batch_cache.clone(),
                symbol.to_string(),
            ),
        );

        let sentiment_task = spawn_category(
            "sentiment",
            deadline,
            categories::sentiment(
                self.sentiment.clone().filter(|_| include_batch),
                batch_cache.clone(),
                symbol.to_string(),
            ),
        );

        let corporate_task = spawn_category(
            "corporate",
            deadline,
            categories::corporate(
                self.corporate_actions.clone().filter(|_| include_batch),
                batch_cache,
                symbol.to_string(),
            ),
        );

        let (price, liquidity, options, fundamentals, short_interest, sentiment, corporate) = tokio::join!(
            price_task,
            liquidity_task,
            options_task,
            fundamentals_task,
            short_interest_task,
            sentiment_task,
            corporate_task,
        );

        let categories = Categories {
            price: settle("price", symbol, price),
            liquidity: settle("liquidity", symbol, liquidity),
            options: settle("options", symbol, options),
            fundamentals: settle("fundamentals", symbol, fundamentals),
            short_interest: settle("short_interest", symbol, short_interest),
            sentiment: settle("sentiment", symbol, sentiment),
            corporate: settle("corporate", symbol, corporate),
        };

        let snapshot = merge(symbol, &bars, (*quote).as_ref(), &categories);
        debug!(
            symbol,
            quality = %snapshot.metadata.data_quality,
            missing = snapshot.metadata.missing_fields.len(),
            "Snapshot assembled"
        );

        if self.config.enable_cache {
            self.write_cache(&snapshot, categories);
        }
        snapshot
    }

    /// Store the snapshot and every category computed by this call
    fn write_cache(&self, snapshot: &Snapshot, categories: Categories) {
        let key = snapshot.symbol.as_str();
        self.cache.snapshot.set(key, snapshot.clone());

        if categories.price.is_fresh() {
            self.cache.price.set(key, categories.price.value);
        }
        if categories.liquidity.is_fresh() {
            self.cache.liquidity.set(key, categories.liquidity.value);
        }
        if categories.options.is_fresh() {
            self.cache.options.set(key, categories.options.value);
        }
        if categories.fundamentals.is_fresh() {
            let (value, quality) = categories.fundamentals.value;
            self.cache.value.set(key, value);
            self.cache.quality.set(key, quality);
        }
        if categories.short_interest.is_fresh() {
            self.cache.short_interest.set(key, categories.short_interest.value);
        }
        if categories.sentiment.is_fresh() {
            self.cache.sentiment.set(key, categories.sentiment.value);
        }
        if categories.corporate.is_fresh() {
            self.cache.corporate.set(key, categories.corporate.value);
        }
    }
}

fn validate_symbol(symbol: &str) -> Result<String> {
    let normalized = normalize_symbol(symbol);
    if normalized.is_empty() {
        return Err(SnapshotError::InvalidSymbol(symbol.to_string()));
    }
    Ok(normalized)
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn market_context(bars: &[Bar], quote: Option<&Quote>) -> MarketContext {
    let last_price = quote
        .map(|q| q.last)
        .or_else(|| bars.last().map(|b| b.close));

    // The previous close is the last bar from an earlier trading day than the
    // quote, or the second-to-last bar without a quote.
    let previous_close = match quote {
        Some(q) => {
            let session = q.timestamp.date_naive();
            bars.iter().rev().find(|b| b.timestamp.date_naive() < session)
        }
        None => bars.iter().rev().nth(1),
    }
    .map(|b| b.close);

    let change_pct = match (last_price, previous_close) {
        (Some(last), Some(previous)) if previous > 0.0 => Some((last - previous) / previous * 100.0),
        _ => None,
    };

    MarketContext {
        last_price,
        bid: quote.and_then(|q| q.bid),
        ask: quote.and_then(|q| q.ask),
        volume: quote
            .and_then(|q| q.volume)
            .or_else(|| bars.last().map(|b| b.volume)),
        change_pct,
        bar_count: bars.len(),
        quote_time: quote.map(|q| q.timestamp),
    }
}

fn merge(symbol: &str, bars: &[Bar], quote: Option<&Quote>, categories: &Categories) -> Snapshot {
    let today = Utc::now().date_naive();
    let (value, quality) = categories.fundamentals.value.clone();
    let short_interest = categories.short_interest.value.clone();
    let sentiment = categories.sentiment.value.clone();

    let metadata = SnapshotMetadata {
        price_as_of: quote
            .map(|q| q.timestamp)
            .or_else(|| bars.last().map(|b| b.timestamp)),
        fundamentals_date: value.pe_ratio.map(|_| today),
        short_interest_date: short_interest.settlement_date,
        sentiment_date: sentiment.sentiment_score.map(|_| today),
        ..Default::default()
    };

    let mut snapshot = Snapshot {
        symbol: symbol.to_string(),
        created_at: Utc::now(),
        price: categories.price.value.clone(),
        liquidity: categories.liquidity.value.clone(),
        options: categories.options.value.clone(),
        value,
        quality,
        short_interest,
        sentiment,
        corporate: categories.corporate.value.clone(),
        market: market_context(bars, quote),
        metadata,
    };

    let (data_quality, missing_fields) = quality::assess(&snapshot);
    snapshot.metadata.data_quality = data_quality;
    snapshot.metadata.missing_fields = missing_fields;
    snapshot
}

/// Builder for [`SnapshotOrchestrator`]
///
/// Only the market data provider is required. Calculators default to the
/// crate's own implementations; absent repositories resolve to empty
/// categories.
pub struct SnapshotOrchestratorBuilder {
    market_data: Arc<dyn MarketDataProvider>,
    config: Option<SnapshotConfig>,
    cache: Option<Arc<MultiTierCache>>,
    options_provider: Option<Arc<dyn OptionsDataProvider>>,
    price_calculator: Option<Arc<dyn PriceCalculator>>,
    liquidity_calculator: Option<Arc<dyn LiquidityCalculator>>,
    options_calculator: Option<Arc<dyn OptionsCalculator>>,
    fundamentals: Option<Arc<dyn FundamentalsRepository>>,
    short_interest: Option<Arc<dyn ShortInterestRepository>>,
    sentiment: Option<Arc<dyn SentimentRepository>>,
    corporate_actions: Option<Arc<dyn CorporateActionsRepository>>,
}

impl SnapshotOrchestratorBuilder {
    pub fn new(market_data: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            market_data,
            config: None,
            cache: None,
            options_provider: None,
            price_calculator: None,
            liquidity_calculator: None,
            options_calculator: None,
            fundamentals: None,
            short_interest: None,
            sentiment: None,
            corporate_actions: None,
        }
    }

    pub fn config(mut self, config: SnapshotConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Share an existing cache instead of creating one from the config
    pub fn cache(mut self, cache: Arc<MultiTierCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn options_provider(mut self, provider: Arc<dyn OptionsDataProvider>) -> Self {
        self.options_provider = Some(provider);
        self
    }

    pub fn price_calculator(mut self, calculator: Arc<dyn PriceCalculator>) -> Self {
        self.price_calculator = Some(calculator);
        self
    }

    pub fn liquidity_calculator(mut self, calculator: Arc<dyn LiquidityCalculator>) -> Self {
        self.liquidity_calculator = Some(calculator);
        self
    }

    pub fn options_calculator(mut self, calculator: Arc<dyn OptionsCalculator>) -> Self {
        self.options_calculator = Some(calculator);
        self
    }

    pub fn fundamentals_repository(mut self, repository: Arc<dyn FundamentalsRepository>) -> Self {
        self.fundamentals = Some(repository);
        self
    }

    pub fn short_interest_repository(
        mut self,
        repository: Arc<dyn ShortInterestRepository>,
    ) -> Self {
        self.short_interest = Some(repository);
        self
    }

    pub fn sentiment_repository(mut self, repository: Arc<dyn SentimentRepository>) -> Self {
        self.sentiment = Some(repository);
        self
    }

    pub fn corporate_actions_repository(
        mut self,
        repository: Arc<dyn CorporateActionsRepository>,
    ) -> Self {
        self.corporate_actions = Some(repository);
        self
    }

    pub fn build(self) -> Result<SnapshotOrchestrator> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MultiTierCache::new(&config.cache)));

        debug!(
            cache_enabled = config.enable_cache,
            max_entries = config.cache.max_entries,
            batch_concurrency = config.batch_concurrency,
            "Snapshot orchestrator configured"
        );

        Ok(SnapshotOrchestrator {
            cache,
            market_data: self.market_data,
            options_provider: self.options_provider,
            price_calculator: self
                .price_calculator
                .unwrap_or_else(|| Arc::new(TaPriceCalculator::new())),
            liquidity_calculator: self
                .liquidity_calculator
                .unwrap_or_else(|| Arc::new(BarLiquidityCalculator::new())),
            options_calculator: self
                .options_calculator
                .unwrap_or_else(|| Arc::new(TimeoutOptionsCalculator::new())),
            fundamentals: self.fundamentals,
            short_interest: self.short_interest,
            sentiment: self.sentiment,
            corporate_actions: self.corporate_actions,
            config,
        })
    }
}
