//! Price indicators computed with the `ta` crate

use ta::{
    Next,
    indicators::{
        AverageTrueRange, BollingerBands, ExponentialMovingAverage,
        MovingAverageConvergenceDivergence, RelativeStrengthIndex, SimpleMovingAverage,
    },
};

use crate::model::{Bar, PriceIndicators};
use crate::providers::PriceCalculator;

/// Bars in a trading year, used for the 52-week range
const TRADING_YEAR: usize = 252;

impl ta::Open for Bar {
    fn open(&self) -> f64 {
        self.open
    }
}

impl ta::High for Bar {
    fn high(&self) -> f64 {
        self.high
    }
}

impl ta::Low for Bar {
    fn low(&self) -> f64 {
        self.low
    }
}

impl ta::Close for Bar {
    fn close(&self) -> f64 {
        self.close
    }
}

impl ta::Volume for Bar {
    fn volume(&self) -> f64 {
        self.volume as f64
    }
}

/// Default price calculator
///
/// A field is only reported once there are enough bars for the indicator to
/// have warmed up; before that it stays `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaPriceCalculator;

impl TaPriceCalculator {
    pub fn new() -> Self {
        Self
    }
}

/// Feed every close through an indicator and keep the last output
fn last_output<I>(indicator: Option<I>, closes: &[f64]) -> Option<I::Output>
where
    I: Next<f64>,
{
    let mut indicator = indicator?;
    closes.iter().map(|&close| indicator.next(close)).last()
}

fn sma(closes: &[f64], period: usize) -> Option<f64> {
    if closes.len() < period {
        return None;
    }
    last_output(SimpleMovingAverage::new(period).ok(), closes)
}

fn ema(closes: &[f64], period: usize) -> Option<f64> {
    if closes.len() < period {
        return None;
    }
    last_output(ExponentialMovingAverage::new(period).ok(), closes)
}

/// Simple return over `lookback` bars
fn trailing_return(closes: &[f64], lookback: usize) -> Option<f64> {
    let n = closes.len();
    if n <= lookback {
        return None;
    }
    let base = closes[n - 1 - lookback];
    (base != 0.0).then(|| closes[n - 1] / base - 1.0)
}

impl PriceCalculator for TaPriceCalculator {
    fn calculate(&self, bars: &[Bar]) -> PriceIndicators {
        if bars.is_empty() {
            return PriceIndicators::default();
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let n = closes.len();

        let rsi_14 = if n > 14 {
            last_output(RelativeStrengthIndex::new(14).ok(), &closes)
        } else {
            None
        };

        let macd = if n >= 26 + 9 {
            last_output(MovingAverageConvergenceDivergence::new(12, 26, 9).ok(), &closes)
        } else {
            None
        };

        let bollinger = if n >= 20 {
            last_output(BollingerBands::new(20, 2.0).ok(), &closes)
        } else {
            None
        };

        let atr_14 = if n > 14 {
            AverageTrueRange::new(14)
                .ok()
                .and_then(|mut atr| bars.iter().map(|bar| atr.next(bar)).last())
        } else {
            None
        };

        let year = &bars[n.saturating_sub(TRADING_YEAR)..];
        let high_52w = year.iter().map(|b| b.high).reduce(f64::max);
        let low_52w = year.iter().map(|b| b.low).reduce(f64::min);

        PriceIndicators {
            rsi_14,
            macd_line: macd.as_ref().map(|m| m.macd),
            macd_signal: macd.as_ref().map(|m| m.signal),
            macd_histogram: macd.as_ref().map(|m| m.histogram),
            sma_20: sma(&closes, 20),
            sma_50: sma(&closes, 50),
            sma_200: sma(&closes, 200),
            ema_12: ema(&closes, 12),
            ema_26: ema(&closes, 26),
            bollinger_upper: bollinger.as_ref().map(|b| b.upper),
            bollinger_middle: bollinger.as_ref().map(|b| b.average),
            bollinger_lower: bollinger.as_ref().map(|b| b.lower),
            atr_14,
            return_1d: trailing_return(&closes, 1),
            return_5d: trailing_return(&closes, 5),
            return_20d: trailing_return(&closes, 20),
            high_52w,
            low_52w,
        }
    }
}
