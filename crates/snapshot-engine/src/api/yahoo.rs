//! Yahoo Finance market data provider

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::debug;
use yahoo_finance_api as yahoo;

use crate::error::{Result, SnapshotError};
use crate::model::{Bar, Quote};
use crate::providers::MarketDataProvider;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Default request budget against the public endpoints
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;

/// Daily bars and latest quotes from Yahoo Finance
///
/// Yahoo does not publish bid/ask on this endpoint, so quotes carry only the
/// last price and session volume.
#[derive(Clone)]
pub struct YahooMarketData {
    rate_limiter: SharedRateLimiter,
}

impl YahooMarketData {
    pub fn new() -> Self {
        Self::with_rate_limit(DEFAULT_REQUESTS_PER_MINUTE)
    }

    /// Limit outgoing requests to `per_minute` (at least one)
    pub fn with_rate_limit(per_minute: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN));
        Self {
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    fn connector() -> Result<yahoo::YahooConnector> {
        yahoo::YahooConnector::new().map_err(|e| SnapshotError::YahooFinance(e.to_string()))
    }
}

impl Default for YahooMarketData {
    fn default() -> Self {
        Self::new()
    }
}

fn timestamp(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap_or_else(Utc::now)
}

fn to_bar(quote: &yahoo::Quote) -> Bar {
    Bar {
        timestamp: timestamp(quote.timestamp as i64),
        open: quote.open,
        high: quote.high,
        low: quote.low,
        close: quote.close,
        volume: quote.volume,
    }
}

/// Calendar days needed to cover `bars` trading sessions, with slack for holidays
fn calendar_days_for(bars: usize) -> i64 {
    i64::try_from(bars.saturating_mul(7) / 5 + 10).unwrap_or(i64::MAX / 2)
}

#[async_trait]
impl MarketDataProvider for YahooMarketData {
    async fn get_bars(&self, symbol: &str, limit: usize) -> Result<Vec<Bar>> {
        self.rate_limiter.until_ready().await;

        let end = OffsetDateTime::now_utc();
        let start = end - time::Duration::days(calendar_days_for(limit));

        let response = Self::connector()?
            .get_quote_history(symbol, start, end)
            .await
            .map_err(|e| SnapshotError::market_data(symbol, e.to_string()))?;
        let quotes = response
            .quotes()
            .map_err(|e| SnapshotError::market_data(symbol, e.to_string()))?;

        let mut bars: Vec<Bar> = quotes.iter().map(to_bar).collect();
        if bars.len() > limit {
            bars.drain(..bars.len() - limit);
        }

        debug!(symbol, bars = bars.len(), "Fetched Yahoo bars");
        Ok(bars)
    }

    async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>> {
        self.rate_limiter.until_ready().await;

        let response = Self::connector()?
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(|e| SnapshotError::market_data(symbol, e.to_string()))?;

        // an empty chart means no trades yet, not a failure
        let Ok(latest) = response.last_quote() else {
            return Ok(None);
        };

        Ok(Some(Quote {
            symbol: symbol.to_string(),
            bid: None,
            ask: None,
            last: latest.close,
            volume: Some(latest.volume),
            timestamp: timestamp(latest.timestamp as i64),
        }))
    }
}
