//! Liquidity indicators from bar volume and the quoted spread

use crate::model::{Bar, LiquidityIndicators, Quote};
use crate::providers::LiquidityCalculator;

const VOLUME_WINDOW: usize = 20;

/// Default liquidity calculator
#[derive(Debug, Clone, Copy, Default)]
pub struct BarLiquidityCalculator;

impl BarLiquidityCalculator {
    pub fn new() -> Self {
        Self
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

impl LiquidityCalculator for BarLiquidityCalculator {
    fn calculate(&self, bars: &[Bar], quote: Option<&Quote>) -> LiquidityIndicators {
        let window = &bars[bars.len().saturating_sub(VOLUME_WINDOW)..];

        let avg_volume_20d = mean(window.iter().map(|b| b.volume as f64));
        let avg_dollar_volume_20d = mean(window.iter().map(|b| b.close * b.volume as f64));

        let latest_volume = quote
            .and_then(|q| q.volume)
            .or_else(|| bars.last().map(|b| b.volume));
        let relative_volume = match (latest_volume, avg_volume_20d) {
            (Some(latest), Some(avg)) if avg > 0.0 => Some(latest as f64 / avg),
            _ => None,
        };

        let bid_ask_spread = quote.and_then(Quote::spread);
        let bid_ask_spread_pct = quote
            .and_then(|q| Some((q.spread()?, q.mid()?)))
            .map(|(spread, mid)| spread / mid * 100.0);

        LiquidityIndicators {
            avg_volume_20d,
            avg_dollar_volume_20d,
            relative_volume,
            bid_ask_spread,
            bid_ask_spread_pct,
        }
    }
}
