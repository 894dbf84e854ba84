//! Collaborator contracts consumed by the orchestrator
//!
//! Market data clients, the options data source, indicator calculators and
//! the persistence repositories are all pluggable. Each is shared behind an
//! `Arc<dyn Trait>` so spawned category tasks can hold their own handle.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    Bar, CorporateActionsRecord, Dividend, FundamentalsRecord, LiquidityIndicators,
    OptionsIndicators, PriceIndicators, Quote, SentimentRecord, ShortInterestRecord, Split,
};

/// Source of bars and quotes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Most recent `limit` daily bars, oldest first
    async fn get_bars(&self, symbol: &str, limit: usize) -> Result<Vec<Bar>>;

    /// Latest quote, `None` when the venue has nothing for the symbol
    async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>>;
}

/// Source of options-derived measures
///
/// The three calls are independent and may be awaited concurrently.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OptionsDataProvider: Send + Sync {
    async fn get_implied_volatility(&self, symbol: &str) -> Result<Option<f64>>;

    async fn get_iv_skew(&self, symbol: &str) -> Result<Option<f64>>;

    async fn get_put_call_ratio(&self, symbol: &str) -> Result<Option<f64>>;
}

/// Computes price indicators from bars
pub trait PriceCalculator: Send + Sync {
    fn calculate(&self, bars: &[Bar]) -> PriceIndicators;
}

/// Computes liquidity indicators from bars and the latest quote
pub trait LiquidityCalculator: Send + Sync {
    fn calculate(&self, bars: &[Bar], quote: Option<&Quote>) -> LiquidityIndicators;
}

/// Computes options indicators by querying an options data provider
#[async_trait]
pub trait OptionsCalculator: Send + Sync {
    async fn calculate(
        &self,
        symbol: &str,
        provider: &dyn OptionsDataProvider,
    ) -> Result<OptionsIndicators>;
}

/// Latest fundamentals per symbol
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FundamentalsRepository: Send + Sync {
    async fn get_latest(&self, symbol: &str) -> Result<Option<FundamentalsRecord>>;
}

/// Latest short interest per symbol
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShortInterestRepository: Send + Sync {
    async fn get_latest(&self, symbol: &str) -> Result<Option<ShortInterestRecord>>;
}

/// Latest sentiment per symbol
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SentimentRepository: Send + Sync {
    async fn get_latest(&self, symbol: &str) -> Result<Option<SentimentRecord>>;
}

/// Corporate actions per symbol
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CorporateActionsRepository: Send + Sync {
    async fn get_latest(&self, symbol: &str) -> Result<Option<CorporateActionsRecord>>;

    /// Dividend history, any order
    async fn get_dividends(&self, symbol: &str) -> Result<Vec<Dividend>>;

    /// Split history, any order
    async fn get_splits(&self, symbol: &str) -> Result<Vec<Split>>;
}
