//! Options indicators with a per-call timeout guard
//!
//! Each of the three provider calls races its own timer. A call that times
//! out or fails degrades only its own field to `None`.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::Result;
use crate::model::OptionsIndicators;
use crate::providers::{OptionsCalculator, OptionsDataProvider};
use crate::timeout::with_timeout;

/// Default deadline for each options provider call
pub const DEFAULT_OPTIONS_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default options calculator
#[derive(Debug, Clone, Copy)]
pub struct TimeoutOptionsCalculator {
    timeout: Duration,
}

impl TimeoutOptionsCalculator {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_OPTIONS_TIMEOUT,
        }
    }

    /// Use a custom per-call deadline
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn guarded<F>(&self, field: &str, symbol: &str, call: F) -> Option<f64>
    where
        F: Future<Output = Result<Option<f64>>>,
    {
        match with_timeout(field, self.timeout, call).await {
            Ok(value) => value,
            Err(e) => {
                warn!(symbol, field, error = %e, "Options provider call degraded to null");
                None
            }
        }
    }
}

impl Default for TimeoutOptionsCalculator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OptionsCalculator for TimeoutOptionsCalculator {
    async fn calculate(
        &self,
        symbol: &str,
        provider: &dyn OptionsDataProvider,
    ) -> Result<OptionsIndicators> {
        let (atm_iv, iv_skew, put_call_ratio) = tokio::join!(
            self.guarded("implied_volatility", symbol, provider.get_implied_volatility(symbol)),
            self.guarded("iv_skew", symbol, provider.get_iv_skew(symbol)),
            self.guarded("put_call_ratio", symbol, provider.get_put_call_ratio(symbol)),
        );

        Ok(OptionsIndicators {
            atm_iv,
            iv_skew,
            put_call_ratio,
        })
    }
}
