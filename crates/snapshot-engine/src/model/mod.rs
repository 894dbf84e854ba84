//! Snapshot data model
//!
//! Inputs consumed from collaborators (bars, quotes, repository records) and
//! the fixed-shape snapshot assembled from them.

pub mod indicators;
pub mod market;
pub mod records;
pub mod snapshot;

pub use indicators::{
    CorporateIndicators, LiquidityIndicators, OptionsIndicators, PriceIndicators,
    QualityIndicators, SentimentIndicators, ShortInterestIndicators, ValueIndicators,
};
pub use market::{Bar, Quote};
pub use records::{
    CorporateActionsRecord, Dividend, FundamentalsRecord, SentimentRecord, ShortInterestRecord,
    Split,
};
pub use snapshot::{DataQuality, MarketContext, Snapshot, SnapshotMetadata};

/// Normalize a ticker symbol: trimmed and upper-cased
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
