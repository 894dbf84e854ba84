//! Per-category computations run as independent tasks
//!
//! Each function owns its inputs so it can be spawned. Repository-backed
//! categories read through their sub-cache when the caller allows cache
//! reads. Cache writes are left to the orchestrator, which performs them
//! once the whole snapshot is assembled.

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, warn};

use crate::cache::{MultiTierCache, TtlLruCache};
use crate::error::{Result, SnapshotError};
use crate::model::{
    CorporateActionsRecord, CorporateIndicators, Dividend, OptionsIndicators, QualityIndicators,
    SentimentIndicators, ShortInterestIndicators, Split, ValueIndicators,
};
use crate::providers::{
    CorporateActionsRepository, FundamentalsRepository, OptionsCalculator, OptionsDataProvider,
    SentimentRepository, ShortInterestRepository,
};
use crate::timeout::with_timeout;

/// Where a category value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Produced by this call; eligible for a cache write
    Computed,
    /// Served from the category's sub-cache
    Cached,
    /// Disabled, unconfigured, or failed; holds the empty value
    Unavailable,
}

#[derive(Debug, Clone)]
pub(crate) struct Computed<T> {
    pub value: T,
    pub origin: Origin,
}

impl<T> Computed<T> {
    pub fn fresh(value: T) -> Self {
        Self {
            value,
            origin: Origin::Computed,
        }
    }

    pub fn cached(value: T) -> Self {
        Self {
            value,
            origin: Origin::Cached,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.origin == Origin::Computed
    }
}

impl<T: Default> Computed<T> {
    pub fn unavailable() -> Self {
        Self {
            value: T::default(),
            origin: Origin::Unavailable,
        }
    }
}

/// Spawn a category computation, optionally bounded by a deadline
pub(crate) fn spawn_category<T, F>(
    name: &'static str,
    deadline: Option<Duration>,
    future: F,
) -> JoinHandle<Result<Computed<T>>>
where
    T: Send + 'static,
    F: Future<Output = Result<Computed<T>>> + Send + 'static,
{
    tokio::spawn(async move {
        match deadline {
            Some(limit) => with_timeout(name, limit, future).await,
            None => future.await,
        }
    })
}

/// Capture one task's outcome, substituting the empty value on failure
pub(crate) fn settle<T: Default>(
    category: &'static str,
    symbol: &str,
    outcome: std::result::Result<Result<Computed<T>>, JoinError>,
) -> Computed<T> {
    match outcome.map_err(SnapshotError::from).and_then(|inner| inner) {
        Ok(computed) => computed,
        Err(e) => {
            warn!(symbol, category, error = %e, "Category failed, using empty values");
            Computed::unavailable()
        }
    }
}

/// Serve from a sub-cache when possible, otherwise run `fetch`
async fn read_through<T, Fut>(
    cache: Option<&MultiTierCache>,
    tier: fn(&MultiTierCache) -> &TtlLruCache<T>,
    symbol: &str,
    fetch: Option<Fut>,
) -> Result<Computed<T>>
where
    T: Clone + Default,
    Fut: Future<Output = Result<T>>,
{
    if let Some(cache) = cache {
        let tier = tier(cache);
        if let Some(hit) = tier.get(symbol) {
            debug!(symbol, cache = tier.category().as_str(), "Category cache hit");
            return Ok(Computed::cached(hit));
        }
    }

    match fetch {
        Some(fetch) => Ok(Computed::fresh(fetch.await?)),
        None => Ok(Computed::unavailable()),
    }
}

pub(crate) async fn options(
    calculator: Arc<dyn OptionsCalculator>,
    provider: Option<Arc<dyn OptionsDataProvider>>,
    symbol: String,
) -> Result<Computed<OptionsIndicators>> {
    match provider {
        Some(provider) => {
            let indicators = calculator.calculate(&symbol, provider.as_ref()).await?;
            Ok(Computed::fresh(indicators))
        }
        None => Ok(Computed::unavailable()),
    }
}

/// Value and quality share one repository lookup and are cached side by side
pub(crate) async fn fundamentals(
    repository: Option<Arc<dyn FundamentalsRepository>>,
    cache: Option<Arc<MultiTierCache>>,
    symbol: String,
) -> Result<Computed<(ValueIndicators, QualityIndicators)>> {
    if let Some(cache) = cache.as_deref() {
        // quality is only consulted once value has hit
        let pair = cache
            .value
            .get(&symbol)
            .and_then(|value| cache.quality.get(&symbol).map(|quality| (value, quality)));
        if let Some(pair) = pair {
            debug!(symbol = %symbol, "Fundamentals cache hit");
            return Ok(Computed::cached(pair));
        }
    }

    let Some(repository) = repository else {
        return Ok(Computed::unavailable());
    };

    let record = repository.get_latest(&symbol).await?;
    let pair = record
        .as_ref()
        .map(|r| (ValueIndicators::from(r), QualityIndicators::from(r)))
        .unwrap_or_default();
    Ok(Computed::fresh(pair))
}

pub(crate) async fn short_interest(
    repository: Option<Arc<dyn ShortInterestRepository>>,
    cache: Option<Arc<MultiTierCache>>,
    symbol: String,
) -> Result<Computed<ShortInterestIndicators>> {
    let key = symbol.as_str();
    let fetch = repository.as_ref().map(|repository| async move {
        let record = repository.get_latest(key).await?;
        Ok::<_, SnapshotError>(
            record
                .as_ref()
                .map(ShortInterestIndicators::from)
                .unwrap_or_default(),
        )
    });
    read_through(cache.as_deref(), |c| &c.short_interest, key, fetch).await
}

pub(crate) async fn sentiment(
    repository: Option<Arc<dyn SentimentRepository>>,
    cache: Option<Arc<MultiTierCache>>,
    symbol: String,
) -> Result<Computed<SentimentIndicators>> {
    let key = symbol.as_str();
    let fetch = repository.as_ref().map(|repository| async move {
        let record = repository.get_latest(key).await?;
        Ok::<_, SnapshotError>(
            record
                .as_ref()
                .map(SentimentIndicators::from)
                .unwrap_or_default(),
        )
    });
    read_through(cache.as_deref(), |c| &c.sentiment, key, fetch).await
}

/// Latest record, dividends and splits are queried together and joined
pub(crate) async fn corporate(
    repository: Option<Arc<dyn CorporateActionsRepository>>,
    cache: Option<Arc<MultiTierCache>>,
    symbol: String,
) -> Result<Computed<CorporateIndicators>> {
    let key = symbol.as_str();
    let fetch = repository.as_ref().map(|repository| async move {
        let (latest, dividends, splits) = tokio::join!(
            repository.get_latest(key),
            repository.get_dividends(key),
            repository.get_splits(key),
        );
        Ok::<_, SnapshotError>(corporate_indicators(
            latest?.as_ref(),
            &dividends?,
            &splits?,
            Utc::now().date_naive(),
        ))
    });
    read_through(cache.as_deref(), |c| &c.corporate, key, fetch).await
}

/// Derive corporate indicators as of `today`
pub(crate) fn corporate_indicators(
    record: Option<&CorporateActionsRecord>,
    dividends: &[Dividend],
    splits: &[Split],
    today: NaiveDate,
) -> CorporateIndicators {
    let year_ago = today - ChronoDuration::days(365);
    let trailing: Vec<&Dividend> = dividends
        .iter()
        .filter(|d| d.ex_date > year_ago && d.ex_date <= today)
        .collect();

    let (dividend_ttm, dividend_count_12m) = if dividends.is_empty() {
        (None, None)
    } else {
        (
            Some(trailing.iter().map(|d| d.amount).sum()),
            u32::try_from(trailing.len()).ok(),
        )
    };

    let last_paid = dividends
        .iter()
        .filter(|d| d.ex_date <= today)
        .map(|d| d.ex_date)
        .max();
    let last_split = splits
        .iter()
        .filter(|s| s.date <= today)
        .max_by_key(|s| s.date);

    CorporateIndicators {
        next_earnings_date: record
            .and_then(|r| r.next_earnings_date)
            .filter(|date| *date >= today),
        ex_dividend_date: record.and_then(|r| r.ex_dividend_date).or(last_paid),
        dividend_ttm,
        dividend_count_12m,
        last_split_date: last_split.map(|s| s.date),
        last_split_ratio: last_split.map(|s| s.ratio),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockSentimentRepository;
    use crate::testing::{StubRepository, sample_fundamentals, sample_sentiment};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_corporate_indicators() {
        let today = date(2024, 9, 17);
        let dividends = vec![
            Dividend {
                ex_date: date(2024, 8, 12),
                amount: 0.25,
            },
            Dividend {
                ex_date: date(2024, 5, 10),
                amount: 0.25,
            },
            Dividend {
                ex_date: date(2023, 8, 11),
                amount: 0.24,
            },
        ];
        let splits = vec![
            Split {
                date: date(2014, 6, 9),
                ratio: 7.0,
            },
            Split {
                date: date(2020, 8, 31),
                ratio: 4.0,
            },
        ];
        let record = CorporateActionsRecord {
            symbol: "AAPL".to_string(),
            next_earnings_date: Some(date(2024, 10, 31)),
            ex_dividend_date: None,
        };

        let indicators = corporate_indicators(Some(&record), &dividends, &splits, today);

        assert_eq!(indicators.next_earnings_date, Some(date(2024, 10, 31)));
        assert_eq!(indicators.ex_dividend_date, Some(date(2024, 8, 12)));
        assert!((indicators.dividend_ttm.unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(indicators.dividend_count_12m, Some(2));
        assert_eq!(indicators.last_split_date, Some(date(2020, 8, 31)));
        assert_eq!(indicators.last_split_ratio, Some(4.0));
    }

    #[test]
    fn test_corporate_indicators_without_history() {
        let indicators = corporate_indicators(None, &[], &[], date(2024, 9, 17));
        assert_eq!(indicators, CorporateIndicators::default());
    }

    #[test]
    fn test_past_earnings_date_is_dropped() {
        let record = CorporateActionsRecord {
            symbol: "AAPL".to_string(),
            next_earnings_date: Some(date(2024, 8, 1)),
            ex_dividend_date: Some(date(2024, 8, 12)),
        };
        let indicators = corporate_indicators(Some(&record), &[], &[], date(2024, 9, 17));
        assert_eq!(indicators.next_earnings_date, None);
        assert_eq!(indicators.ex_dividend_date, Some(date(2024, 8, 12)));
    }

    #[tokio::test]
    async fn test_settle_substitutes_empty_value() {
        let failed: Result<Computed<SentimentIndicators>> =
            Err(SnapshotError::repository("sentiment", "timeout"));
        let settled = settle("sentiment", "AAPL", Ok(failed));
        assert_eq!(settled.origin, Origin::Unavailable);
        assert_eq!(settled.value, SentimentIndicators::default());
    }

    async fn exploding() -> Result<Computed<SentimentIndicators>> {
        panic!("repository driver bug")
    }

    #[tokio::test]
    async fn test_settle_captures_panicking_task() {
        let handle = spawn_category("sentiment", None, exploding());
        let settled = settle("sentiment", "AAPL", handle.await);
        assert_eq!(settled.origin, Origin::Unavailable);
    }

    #[tokio::test]
    async fn test_read_through_prefers_cache() {
        let cache = Arc::new(MultiTierCache::default_config());
        cache.sentiment.set("AAPL", SentimentIndicators {
            sentiment_score: Some(-0.5),
            ..Default::default()
        });

        let mut repository = MockSentimentRepository::new();
        repository.expect_get_latest().never();

        let computed = sentiment(
            Some(Arc::new(repository) as Arc<dyn SentimentRepository>),
            Some(Arc::clone(&cache)),
            "AAPL".to_string(),
        )
        .await
        .unwrap();

        assert_eq!(computed.origin, Origin::Cached);
        assert_eq!(computed.value.sentiment_score, Some(-0.5));
    }

    #[tokio::test]
    async fn test_fundamentals_lookup_stops_at_value_miss() {
        let cache = Arc::new(MultiTierCache::default_config());
        cache.quality.set("AAPL", QualityIndicators::default());
        let repository = Arc::new(StubRepository::returning(Some(sample_fundamentals())));

        let computed = fundamentals(
            Some(Arc::clone(&repository) as Arc<dyn FundamentalsRepository>),
            Some(Arc::clone(&cache)),
            "AAPL".to_string(),
        )
        .await
        .unwrap();

        assert_eq!(computed.origin, Origin::Computed);
        assert_eq!(computed.value.0.pe_ratio, Some(33.1));
        assert_eq!(repository.calls(), 1);
        assert_eq!(cache.value.metrics().misses, 1);
        assert_eq!(cache.quality.metrics().hits, 0);
        assert_eq!(cache.quality.metrics().misses, 0);
    }

    #[tokio::test]
    async fn test_fundamentals_hit_needs_both_tiers() {
        let cache = Arc::new(MultiTierCache::default_config());
        cache.value.set("AAPL", ValueIndicators::default());
        cache.quality.set("AAPL", QualityIndicators::default());
        let repository = Arc::new(StubRepository::returning(Some(sample_fundamentals())));

        let computed = fundamentals(
            Some(Arc::clone(&repository) as Arc<dyn FundamentalsRepository>),
            Some(Arc::clone(&cache)),
            "AAPL".to_string(),
        )
        .await
        .unwrap();

        assert_eq!(computed.origin, Origin::Cached);
        assert_eq!(repository.calls(), 0);
        assert_eq!(cache.value.metrics().hits, 1);
        assert_eq!(cache.quality.metrics().hits, 1);
    }

    #[tokio::test]
    async fn test_read_through_skips_cache_when_not_allowed() {
        let cache = Arc::new(MultiTierCache::default_config());
        cache.sentiment.set("AAPL", SentimentIndicators::default());
        let repository = Arc::new(StubRepository::returning(Some(sample_sentiment())));

        let computed = sentiment(
            Some(Arc::clone(&repository) as Arc<dyn SentimentRepository>),
            None,
            "AAPL".to_string(),
        )
        .await
        .unwrap();

        assert!(computed.is_fresh());
        assert_eq!(computed.value.sentiment_score, Some(0.42));
        assert_eq!(repository.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_repository_is_unavailable() {
        let computed = short_interest(None, None, "AAPL".to_string()).await.unwrap();
        assert_eq!(computed.origin, Origin::Unavailable);
        assert!(!computed.value.has_data());
    }

    #[tokio::test(start_paused = true)]
    async fn test_category_deadline() {
        let handle = spawn_category::<SentimentIndicators, _>(
            "sentiment",
            Some(Duration::from_secs(1)),
            async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Computed::fresh(SentimentIndicators::default()))
            },
        );
        let outcome = handle.await.unwrap();
        assert!(matches!(outcome, Err(SnapshotError::Timeout { .. })));
    }
}
