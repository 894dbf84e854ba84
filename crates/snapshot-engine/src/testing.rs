//! Test fixtures: deterministic inputs and counting stub collaborators

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::SnapshotConfig;
use crate::engine::SnapshotOrchestrator;
use crate::error::{Result, SnapshotError};
use crate::model::{
    Bar, CorporateActionsRecord, Dividend, FundamentalsRecord, Quote, SentimentRecord,
    ShortInterestRecord, Split,
};
use crate::providers::{
    CorporateActionsRepository, FundamentalsRepository, MarketDataProvider, OptionsDataProvider,
    SentimentRepository, ShortInterestRepository,
};

/// `n` daily bars with a gentle oscillating uptrend
pub fn sample_bars(n: usize) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let x = i as f64;
            let close = 100.0 + 10.0 * (x / 5.0).sin() + 0.1 * x;
            Bar {
                timestamp: start + ChronoDuration::days(i as i64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000_000 + (i as u64 % 7) * 10_000,
            }
        })
        .collect()
}

/// A two-sided quote 10 cents wide around 100
pub fn sample_quote(symbol: &str) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        bid: Some(99.95),
        ask: Some(100.05),
        last: 100.0,
        volume: Some(1_200_000),
        timestamp: Utc.with_ymd_and_hms(2024, 9, 17, 19, 59, 0).unwrap(),
    }
}

/// Market data stub counting calls and tracking in-flight requests
pub struct StubMarketData {
    bar_count: usize,
    delay: Option<Duration>,
    pub fail_bars: AtomicBool,
    pub fail_quote: AtomicBool,
    pub bars_calls: AtomicUsize,
    pub quote_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    panic_symbols: HashSet<String>,
}

impl StubMarketData {
    pub fn new(bar_count: usize) -> Self {
        Self {
            bar_count,
            delay: None,
            fail_bars: AtomicBool::new(false),
            fail_quote: AtomicBool::new(false),
            bars_calls: AtomicUsize::new(0),
            quote_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            panic_symbols: HashSet::new(),
        }
    }

    /// Hold each bars request open for `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Panic inside the bars request for `symbol`
    pub fn panicking_on(mut self, symbol: &str) -> Self {
        self.panic_symbols.insert(symbol.to_string());
        self
    }

    pub fn bars_calls(&self) -> usize {
        self.bars_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for StubMarketData {
    async fn get_bars(&self, symbol: &str, limit: usize) -> Result<Vec<Bar>> {
        self.bars_calls.fetch_add(1, Ordering::SeqCst);
        assert!(
            !self.panic_symbols.contains(symbol),
            "market data stub exploded for {symbol}"
        );

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_bars.load(Ordering::SeqCst) {
            return Err(SnapshotError::market_data(symbol, "bars endpoint returned 503"));
        }
        Ok(sample_bars(self.bar_count.min(limit)))
    }

    async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_quote.load(Ordering::SeqCst) {
            return Err(SnapshotError::market_data(symbol, "quote stream disconnected"));
        }
        Ok(Some(sample_quote(symbol)))
    }
}

/// Options provider stub with an optional slow IV-skew call
pub struct StubOptionsProvider {
    iv: Option<f64>,
    skew: Option<f64>,
    put_call: Option<f64>,
    skew_delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl StubOptionsProvider {
    pub fn new(iv: Option<f64>, skew: Option<f64>, put_call: Option<f64>) -> Self {
        Self {
            iv,
            skew,
            put_call,
            skew_delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_skew_delay(mut self, delay: Duration) -> Self {
        self.skew_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OptionsDataProvider for StubOptionsProvider {
    async fn get_implied_volatility(&self, _symbol: &str) -> Result<Option<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.iv)
    }

    async fn get_iv_skew(&self, _symbol: &str) -> Result<Option<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.skew_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.skew)
    }

    async fn get_put_call_ratio(&self, _symbol: &str) -> Result<Option<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.put_call)
    }
}

/// Repository stub returning a fixed record
pub struct StubRepository<T> {
    record: Option<T>,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl<T: Clone> StubRepository<T> {
    pub fn returning(record: Option<T>) -> Self {
        Self {
            record,
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn lookup(&self, repository: &'static str) -> Result<Option<T>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SnapshotError::repository(repository, "connection refused"));
        }
        Ok(self.record.clone())
    }
}

#[async_trait]
impl FundamentalsRepository for StubRepository<FundamentalsRecord> {
    async fn get_latest(&self, _symbol: &str) -> Result<Option<FundamentalsRecord>> {
        self.lookup("fundamentals")
    }
}

#[async_trait]
impl ShortInterestRepository for StubRepository<ShortInterestRecord> {
    async fn get_latest(&self, _symbol: &str) -> Result<Option<ShortInterestRecord>> {
        self.lookup("short_interest")
    }
}

#[async_trait]
impl SentimentRepository for StubRepository<SentimentRecord> {
    async fn get_latest(&self, _symbol: &str) -> Result<Option<SentimentRecord>> {
        self.lookup("sentiment")
    }
}

/// Corporate actions stub
pub struct StubCorporateActions {
    pub latest: StubRepository<CorporateActionsRecord>,
    dividends: Vec<Dividend>,
    splits: Vec<Split>,
    pub fail_dividends: AtomicBool,
    pub fail_splits: AtomicBool,
}

impl StubCorporateActions {
    pub fn new(
        record: Option<CorporateActionsRecord>,
        dividends: Vec<Dividend>,
        splits: Vec<Split>,
    ) -> Self {
        Self {
            latest: StubRepository::returning(record),
            dividends,
            splits,
            fail_dividends: AtomicBool::new(false),
            fail_splits: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> usize {
        self.latest.calls()
    }
}

#[async_trait]
impl CorporateActionsRepository for StubCorporateActions {
    async fn get_latest(&self, _symbol: &str) -> Result<Option<CorporateActionsRecord>> {
        self.latest.lookup("corporate_actions")
    }

    async fn get_dividends(&self, _symbol: &str) -> Result<Vec<Dividend>> {
        if self.fail_dividends.load(Ordering::SeqCst) {
            return Err(SnapshotError::repository("dividends", "connection refused"));
        }
        Ok(self.dividends.clone())
    }

    async fn get_splits(&self, _symbol: &str) -> Result<Vec<Split>> {
        if self.fail_splits.load(Ordering::SeqCst) {
            return Err(SnapshotError::repository("splits", "connection refused"));
        }
        Ok(self.splits.clone())
    }
}

pub fn sample_fundamentals() -> FundamentalsRecord {
    FundamentalsRecord {
        symbol: "AAPL".to_string(),
        report_date: NaiveDate::from_ymd_opt(2024, 6, 29),
        market_cap: Some(3.4e12),
        pe_ratio: Some(33.1),
        forward_pe: Some(29.8),
        pb_ratio: Some(50.2),
        ps_ratio: Some(8.9),
        ev_to_ebitda: Some(25.4),
        dividend_yield: Some(0.0044),
        roe: Some(1.47),
        roa: Some(0.27),
        gross_margin: Some(0.46),
        operating_margin: Some(0.30),
        debt_to_equity: Some(1.51),
        current_ratio: Some(0.95),
    }
}

pub fn sample_short_interest() -> ShortInterestRecord {
    ShortInterestRecord {
        symbol: "AAPL".to_string(),
        settlement_date: NaiveDate::from_ymd_opt(2024, 8, 30),
        short_interest: Some(128_000_000),
        short_percent_float: Some(0.0084),
        days_to_cover: Some(2.4),
    }
}

pub fn sample_sentiment() -> SentimentRecord {
    SentimentRecord {
        symbol: "AAPL".to_string(),
        sentiment_score: Some(0.42),
        news_volume: Some(187),
        analyst_rating: Some(4.1),
        analyst_target_price: Some(245.0),
    }
}

/// Stub collaborators wired together
pub struct Fixture {
    pub market: Arc<StubMarketData>,
    pub options: Arc<StubOptionsProvider>,
    pub fundamentals: Arc<StubRepository<FundamentalsRecord>>,
    pub short_interest: Arc<StubRepository<ShortInterestRecord>>,
    pub sentiment: Arc<StubRepository<SentimentRecord>>,
    pub corporate: Arc<StubCorporateActions>,
}

impl Fixture {
    /// Every collaborator returns data
    pub fn full() -> Self {
        Self::with_market(StubMarketData::new(260))
    }

    pub fn with_market(market: StubMarketData) -> Self {
        let today = Utc::now().date_naive();
        let corporate = StubCorporateActions::new(
            Some(CorporateActionsRecord {
                symbol: "AAPL".to_string(),
                next_earnings_date: Some(today + ChronoDuration::days(20)),
                ex_dividend_date: None,
            }),
            vec![
                Dividend {
                    ex_date: today - ChronoDuration::days(30),
                    amount: 0.25,
                },
                Dividend {
                    ex_date: today - ChronoDuration::days(120),
                    amount: 0.25,
                },
                Dividend {
                    ex_date: today - ChronoDuration::days(400),
                    amount: 0.24,
                },
            ],
            vec![Split {
                date: NaiveDate::from_ymd_opt(2020, 8, 31).unwrap(),
                ratio: 4.0,
            }],
        );

        Self {
            market: Arc::new(market),
            options: Arc::new(StubOptionsProvider::new(Some(0.28), Some(-0.03), Some(0.9))),
            fundamentals: Arc::new(StubRepository::returning(Some(sample_fundamentals()))),
            short_interest: Arc::new(StubRepository::returning(Some(sample_short_interest()))),
            sentiment: Arc::new(StubRepository::returning(Some(sample_sentiment()))),
            corporate: Arc::new(corporate),
        }
    }

    pub fn orchestrator(&self, config: SnapshotConfig) -> SnapshotOrchestrator {
        SnapshotOrchestrator::builder(Arc::clone(&self.market) as Arc<dyn MarketDataProvider>)
            .config(config)
            .options_provider(Arc::clone(&self.options) as Arc<dyn OptionsDataProvider>)
            .fundamentals_repository(
                Arc::clone(&self.fundamentals) as Arc<dyn FundamentalsRepository>
            )
            .short_interest_repository(
                Arc::clone(&self.short_interest) as Arc<dyn ShortInterestRepository>
            )
            .sentiment_repository(Arc::clone(&self.sentiment) as Arc<dyn SentimentRepository>)
            .corporate_actions_repository(
                Arc::clone(&self.corporate) as Arc<dyn CorporateActionsRepository>
            )
            .build()
            .expect("valid test configuration")
    }
}
