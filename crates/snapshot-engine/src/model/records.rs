//! Records returned by the persistence repositories

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Latest fundamentals row for a symbol
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsRecord {
    pub symbol: String,
    pub report_date: Option<NaiveDate>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub forward_pe: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub ps_ratio: Option<f64>,
    pub ev_to_ebitda: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub roe: Option<f64>,
    pub roa: Option<f64>,
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
}

/// Latest exchange-reported short interest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShortInterestRecord {
    pub symbol: String,
    pub settlement_date: Option<NaiveDate>,
    pub short_interest: Option<u64>,
    pub short_percent_float: Option<f64>,
    pub days_to_cover: Option<f64>,
}

/// Latest aggregated sentiment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentRecord {
    pub symbol: String,
    pub sentiment_score: Option<f64>,
    pub news_volume: Option<u32>,
    pub analyst_rating: Option<f64>,
    pub analyst_target_price: Option<f64>,
}

/// Upcoming corporate events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorporateActionsRecord {
    pub symbol: String,
    pub next_earnings_date: Option<NaiveDate>,
    pub ex_dividend_date: Option<NaiveDate>,
}

/// A paid dividend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dividend {
    pub ex_date: NaiveDate,
    pub amount: f64,
}

/// A stock split, `ratio` = new shares per old share
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub date: NaiveDate,
    pub ratio: f64,
}
