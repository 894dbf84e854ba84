//! Indicator categories
//!
//! Every category carries its full field set at all times. An unavailable
//! value is `None` and serializes as `null`, so the JSON shape of a snapshot
//! never depends on which sources answered.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::records::{FundamentalsRecord, SentimentRecord, ShortInterestRecord};

/// Technical indicators computed from bars
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceIndicators {
    pub rsi_14: Option<f64>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_middle: Option<f64>,
    pub bollinger_lower: Option<f64>,
    pub atr_14: Option<f64>,
    pub return_1d: Option<f64>,
    pub return_5d: Option<f64>,
    pub return_20d: Option<f64>,
    pub high_52w: Option<f64>,
    pub low_52w: Option<f64>,
}

impl PriceIndicators {
    /// True when at least one field is populated
    pub fn has_data(&self) -> bool {
        [
            self.rsi_14,
            self.macd_line,
            self.macd_signal,
            self.macd_histogram,
            self.sma_20,
            self.sma_50,
            self.sma_200,
            self.ema_12,
            self.ema_26,
            self.bollinger_upper,
            self.bollinger_middle,
            self.bollinger_lower,
            self.atr_14,
            self.return_1d,
            self.return_5d,
            self.return_20d,
            self.high_52w,
            self.low_52w,
        ]
        .iter()
        .any(Option::is_some)
    }
}

/// Volume and spread measures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiquidityIndicators {
    pub avg_volume_20d: Option<f64>,
    pub avg_dollar_volume_20d: Option<f64>,
    pub relative_volume: Option<f64>,
    pub bid_ask_spread: Option<f64>,
    pub bid_ask_spread_pct: Option<f64>,
}

impl LiquidityIndicators {
    pub fn has_data(&self) -> bool {
        [
            self.avg_volume_20d,
            self.avg_dollar_volume_20d,
            self.relative_volume,
            self.bid_ask_spread,
            self.bid_ask_spread_pct,
        ]
        .iter()
        .any(Option::is_some)
    }
}

/// Options-derived measures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionsIndicators {
    pub atm_iv: Option<f64>,
    pub iv_skew: Option<f64>,
    pub put_call_ratio: Option<f64>,
}

impl OptionsIndicators {
    pub fn has_data(&self) -> bool {
        self.atm_iv.is_some() || self.iv_skew.is_some() || self.put_call_ratio.is_some()
    }
}

/// Valuation ratios
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueIndicators {
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub forward_pe: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub ps_ratio: Option<f64>,
    pub ev_to_ebitda: Option<f64>,
    pub dividend_yield: Option<f64>,
}

impl ValueIndicators {
    pub fn has_data(&self) -> bool {
        [
            self.market_cap,
            self.pe_ratio,
            self.forward_pe,
            self.pb_ratio,
            self.ps_ratio,
            self.ev_to_ebitda,
            self.dividend_yield,
        ]
        .iter()
        .any(Option::is_some)
    }
}

impl From<&FundamentalsRecord> for ValueIndicators {
    fn from(record: &FundamentalsRecord) -> Self {
        Self {
            market_cap: record.market_cap,
            pe_ratio: record.pe_ratio,
            forward_pe: record.forward_pe,
            pb_ratio: record.pb_ratio,
            ps_ratio: record.ps_ratio,
            ev_to_ebitda: record.ev_to_ebitda,
            dividend_yield: record.dividend_yield,
        }
    }
}

/// Profitability and balance sheet quality
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityIndicators {
    pub roe: Option<f64>,
    pub roa: Option<f64>,
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
}

impl QualityIndicators {
    pub fn has_data(&self) -> bool {
        [
            self.roe,
            self.roa,
            self.gross_margin,
            self.operating_margin,
            self.debt_to_equity,
            self.current_ratio,
        ]
        .iter()
        .any(Option::is_some)
    }
}

impl From<&FundamentalsRecord> for QualityIndicators {
    fn from(record: &FundamentalsRecord) -> Self {
        Self {
            roe: record.roe,
            roa: record.roa,
            gross_margin: record.gross_margin,
            operating_margin: record.operating_margin,
            debt_to_equity: record.debt_to_equity,
            current_ratio: record.current_ratio,
        }
    }
}

/// Short interest as of the last exchange settlement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShortInterestIndicators {
    pub short_interest: Option<u64>,
    pub short_percent_float: Option<f64>,
    pub days_to_cover: Option<f64>,
    pub settlement_date: Option<NaiveDate>,
}

impl ShortInterestIndicators {
    pub fn has_data(&self) -> bool {
        self.short_interest.is_some()
            || self.short_percent_float.is_some()
            || self.days_to_cover.is_some()
    }
}

impl From<&ShortInterestRecord> for ShortInterestIndicators {
    fn from(record: &ShortInterestRecord) -> Self {
        Self {
            short_interest: record.short_interest,
            short_percent_float: record.short_percent_float,
            days_to_cover: record.days_to_cover,
            settlement_date: record.settlement_date,
        }
    }
}

/// News and analyst sentiment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentIndicators {
    pub sentiment_score: Option<f64>,
    pub news_volume: Option<u32>,
    pub analyst_rating: Option<f64>,
    pub analyst_target_price: Option<f64>,
}

impl SentimentIndicators {
    pub fn has_data(&self) -> bool {
        self.sentiment_score.is_some()
            || self.news_volume.is_some()
            || self.analyst_rating.is_some()
            || self.analyst_target_price.is_some()
    }
}

impl From<&SentimentRecord> for SentimentIndicators {
    fn from(record: &SentimentRecord) -> Self {
        Self {
            sentiment_score: record.sentiment_score,
            news_volume: record.news_volume,
            analyst_rating: record.analyst_rating,
            analyst_target_price: record.analyst_target_price,
        }
    }
}

/// Dividends, splits and earnings calendar
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorporateIndicators {
    pub next_earnings_date: Option<NaiveDate>,
    pub ex_dividend_date: Option<NaiveDate>,
    pub dividend_ttm: Option<f64>,
    pub dividend_count_12m: Option<u32>,
    pub last_split_date: Option<NaiveDate>,
    pub last_split_ratio: Option<f64>,
}

impl CorporateIndicators {
    pub fn has_data(&self) -> bool {
        self.next_earnings_date.is_some()
            || self.ex_dividend_date.is_some()
            || self.dividend_ttm.is_some()
            || self.dividend_count_12m.is_some()
            || self.last_split_date.is_some()
            || self.last_split_ratio.is_some()
    }
}
