//! The unified per-symbol snapshot

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::indicators::{
    CorporateIndicators, LiquidityIndicators, OptionsIndicators, PriceIndicators,
    QualityIndicators, SentimentIndicators, ShortInterestIndicators, ValueIndicators,
};

/// Coverage-based data quality grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataQuality {
    Complete,
    Partial,
    Stale,
}

impl std::fmt::Display for DataQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Complete => "COMPLETE",
            Self::Partial => "PARTIAL",
            Self::Stale => "STALE",
        };
        f.write_str(label)
    }
}

/// Raw market inputs the snapshot was built from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    pub last_price: Option<f64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub volume: Option<u64>,
    pub change_pct: Option<f64>,
    pub bar_count: usize,
    pub quote_time: Option<DateTime<Utc>>,
}

/// Provenance and quality markers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub price_as_of: Option<DateTime<Utc>>,
    pub fundamentals_date: Option<NaiveDate>,
    pub short_interest_date: Option<NaiveDate>,
    pub sentiment_date: Option<NaiveDate>,
    pub data_quality: DataQuality,
    pub missing_fields: Vec<String>,
}

impl Default for SnapshotMetadata {
    fn default() -> Self {
        Self {
            price_as_of: None,
            fundamentals_date: None,
            short_interest_date: None,
            sentiment_date: None,
            data_quality: DataQuality::Stale,
            missing_fields: Vec::new(),
        }
    }
}

/// Indicator snapshot for one symbol
///
/// Built once per cache miss and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub symbol: String,
    pub created_at: DateTime<Utc>,
    pub price: PriceIndicators,
    pub liquidity: LiquidityIndicators,
    pub options: OptionsIndicators,
    pub value: ValueIndicators,
    pub quality: QualityIndicators,
    pub short_interest: ShortInterestIndicators,
    pub sentiment: SentimentIndicators,
    pub corporate: CorporateIndicators,
    pub market: MarketContext,
    pub metadata: SnapshotMetadata,
}

impl Snapshot {
    /// A snapshot with every category empty, graded stale
    ///
    /// Used as the placeholder for symbols whose fetch failed in a batch.
    pub fn empty(symbol: impl Into<String>) -> Self {
        let mut snapshot = Self {
            symbol: symbol.into(),
            created_at: Utc::now(),
            price: PriceIndicators::default(),
            liquidity: LiquidityIndicators::default(),
            options: OptionsIndicators::default(),
            value: ValueIndicators::default(),
            quality: QualityIndicators::default(),
            short_interest: ShortInterestIndicators::default(),
            sentiment: SentimentIndicators::default(),
            corporate: CorporateIndicators::default(),
            market: MarketContext::default(),
            metadata: SnapshotMetadata::default(),
        };
        snapshot.metadata.missing_fields = crate::engine::quality::missing_fields(&snapshot);
        snapshot
    }

    /// True when the snapshot carries any market data
    pub fn has_market_data(&self) -> bool {
        self.market.bar_count > 0 || self.market.quote_time.is_some()
    }
}
