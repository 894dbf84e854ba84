//! Data quality scoring
//!
//! Coverage counts five groups: market data with computed price indicators,
//! liquidity, value, short interest and sentiment. Options and corporate data
//! are enrichment and never count towards coverage.

use crate::model::{DataQuality, Snapshot};

/// Number of coverage groups
pub const COVERAGE_GROUPS: usize = 5;

/// How many coverage groups carry data
pub fn coverage(snapshot: &Snapshot) -> usize {
    [
        snapshot.has_market_data() && snapshot.price.has_data(),
        snapshot.liquidity.has_data(),
        snapshot.value.has_data(),
        snapshot.short_interest.has_data(),
        snapshot.sentiment.has_data(),
    ]
    .into_iter()
    .filter(|&covered| covered)
    .count()
}

/// Map a coverage count to a grade
pub fn grade(coverage: usize) -> DataQuality {
    match coverage {
        c if c >= COVERAGE_GROUPS => DataQuality::Complete,
        2..=4 => DataQuality::Partial,
        _ => DataQuality::Stale,
    }
}

/// Representative fields that are null
pub fn missing_fields(snapshot: &Snapshot) -> Vec<String> {
    let checks = [
        ("rsi_14", snapshot.price.rsi_14.is_none()),
        ("atr_14", snapshot.price.atr_14.is_none()),
        ("bid_ask_spread", snapshot.liquidity.bid_ask_spread.is_none()),
        ("atm_iv", snapshot.options.atm_iv.is_none()),
        ("pe_ratio", snapshot.value.pe_ratio.is_none()),
        (
            "short_percent_float",
            snapshot.short_interest.short_percent_float.is_none(),
        ),
        ("sentiment_score", snapshot.sentiment.sentiment_score.is_none()),
    ];

    checks
        .into_iter()
        .filter(|&(_, missing)| missing)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Grade and missing-field list for a snapshot
pub fn assess(snapshot: &Snapshot) -> (DataQuality, Vec<String>) {
    (grade(coverage(snapshot)), missing_fields(snapshot))
}
