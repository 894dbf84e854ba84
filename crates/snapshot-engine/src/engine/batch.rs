//! Batch snapshots with bounded concurrency and progress reporting
//!
//! Symbols are normalized and de-duplicated, cache hits are served first,
//! and the remaining symbols are computed in chunks of at most
//! `concurrency` concurrent pipelines.

use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::orchestrator::SnapshotOrchestrator;
use crate::model::{Snapshot, normalize_symbol};

/// Progress observer, called synchronously from the batch task
pub type ProgressCallback = Arc<dyn Fn(&BatchProgress) + Send + Sync>;

/// Running counters for a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub total: usize,
    /// Cache hits plus finished computations
    pub completed: usize,
    pub cached: usize,
    pub failed: usize,
    /// Symbol most recently dispatched
    pub current: Option<String>,
}

/// Options for [`SnapshotOrchestrator::get_snapshots_batch`]
#[derive(Clone, Default)]
pub struct BatchOptions {
    /// Overrides the configured batch concurrency
    pub concurrency: Option<usize>,
    pub on_progress: Option<ProgressCallback>,
    /// Overrides the configured bypass flag
    pub bypass_cache: Option<bool>,
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn on_progress(mut self, callback: impl Fn(&BatchProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn bypass_cache(mut self, bypass: bool) -> Self {
        self.bypass_cache = Some(bypass);
        self
    }

    fn report(&self, progress: &BatchProgress) {
        if let Some(callback) = &self.on_progress {
            callback(progress);
        }
    }
}

impl fmt::Debug for BatchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchOptions")
            .field("concurrency", &self.concurrency)
            .field("on_progress", &self.on_progress.is_some())
            .field("bypass_cache", &self.bypass_cache)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchMetadata {
    pub total: usize,
    pub successful: usize,
    pub cached: usize,
    pub failed: usize,
    pub execution_time_ms: u128,
}

/// Outcome of a batch
///
/// A failed symbol appears in `errors` and also in `snapshots` as an empty
/// placeholder, so every requested symbol has an entry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub snapshots: HashMap<String, Snapshot>,
    pub errors: HashMap<String, String>,
    pub metadata: BatchMetadata,
}

impl SnapshotOrchestrator {
    /// Snapshots for many symbols
    ///
    /// Never fails as a whole; per-symbol failures are reported in
    /// [`BatchResult::errors`].
    pub async fn get_snapshots_batch<S: AsRef<str>>(
        &self,
        symbols: &[S],
        options: BatchOptions,
    ) -> BatchResult {
        let started = Instant::now();
        let unique: BTreeSet<String> = symbols
            .iter()
            .map(|s| normalize_symbol(s.as_ref()))
            .collect();
        let total = unique.len();
        let mut result = BatchResult::default();

        if total == 0 {
            return result;
        }

        let concurrency = options
            .concurrency
            .unwrap_or(self.config().batch_concurrency)
            .max(1);
        let bypass = options.bypass_cache.unwrap_or(self.config().bypass_cache);
        let read_cache = self.config().enable_cache && !bypass;
        let mut progress = BatchProgress {
            total,
            ..Default::default()
        };

        let mut pending = Vec::new();
        for symbol in unique {
            match read_cache
                .then(|| self.cache().snapshot.get(&symbol))
                .flatten()
            {
                Some(snapshot) => {
                    result.snapshots.insert(symbol, snapshot);
                    progress.cached += 1;
                    progress.completed += 1;
                }
                None => pending.push(symbol),
            }
        }

        debug!(
            total,
            cached = progress.cached,
            pending = pending.len(),
            concurrency,
            "Starting batch"
        );
        if progress.cached > 0 {
            options.report(&progress);
        }

        for chunk in pending.chunks(concurrency) {
            for symbol in chunk {
                progress.current = Some(symbol.clone());
                options.report(&progress);
            }

            let outcomes = join_all(
                chunk
                    .iter()
                    .map(|symbol| self.snapshot_with(symbol, bypass)),
            )
            .await;

            for (symbol, outcome) in chunk.iter().zip(outcomes) {
                match outcome {
                    Ok(snapshot) => {
                        result.snapshots.insert(symbol.clone(), snapshot);
                    }
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "Batch snapshot failed");
                        result.errors.insert(symbol.clone(), e.to_string());
                        result
                            .snapshots
                            .insert(symbol.clone(), Snapshot::empty(symbol.clone()));
                        progress.failed += 1;
                    }
                }
                progress.completed += 1;
            }
            options.report(&progress);
        }

        result.metadata = BatchMetadata {
            total,
            successful: total - progress.failed,
            cached: progress.cached,
            failed: progress.failed,
            execution_time_ms: started.elapsed().as_millis(),
        };

        info!(
            total,
            successful = result.metadata.successful,
            cached = result.metadata.cached,
            failed = result.metadata.failed,
            elapsed_ms = result.metadata.execution_time_ms,
            "Batch complete"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SnapshotConfig;
    use crate::model::DataQuality;
    use crate::testing::{Fixture, StubMarketData};
    use parking_lot::Mutex;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn recorder() -> (Arc<Mutex<Vec<BatchProgress>>>, BatchOptions) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let options = BatchOptions::new().on_progress(move |p| sink.lock().push(p.clone()));
        (events, options)
    }

    #[tokio::test]
    async fn test_symbols_are_deduplicated() {
        let fixture = Fixture::full();
        let orchestrator = fixture.orchestrator(SnapshotConfig::default());

        let result = orchestrator
            .get_snapshots_batch(&["AAPL", "aapl", " MSFT"], BatchOptions::new())
            .await;

        assert_eq!(result.snapshots.len(), 2);
        assert!(result.snapshots.contains_key("AAPL"));
        assert!(result.snapshots.contains_key("MSFT"));
        assert_eq!(result.metadata.total, 2);
        assert_eq!(result.metadata.successful, 2);
        assert_eq!(fixture.market.bars_calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let fixture = Fixture::full();
        let orchestrator = fixture.orchestrator(SnapshotConfig::default());
        let (events, options) = recorder();

        let result = orchestrator
            .get_snapshots_batch::<&str>(&[], options)
            .await;

        assert!(result.snapshots.is_empty());
        assert_eq!(result.metadata, BatchMetadata::default());
        assert!(events.lock().is_empty());
    }

    #[tokio::test]
    async fn test_cached_symbols_are_counted() {
        let fixture = Fixture::full();
        let orchestrator = fixture.orchestrator(SnapshotConfig::default());
        orchestrator.get_snapshot("AAPL").await.unwrap();
        let (events, options) = recorder();

        let result = orchestrator
            .get_snapshots_batch(&["AAPL", "MSFT", "NVDA"], options)
            .await;

        assert_eq!(result.metadata.cached, 1);
        assert_eq!(result.metadata.successful, 3);
        assert_eq!(fixture.market.bars_calls(), 3);

        let events = events.lock();
        assert_eq!(events[0].cached, 1);
        assert_eq!(events[0].completed, 1);
        assert_eq!(events[0].current, None);
    }

    #[tokio::test]
    async fn test_bypass_skips_cached_symbols() {
        let fixture = Fixture::full();
        let orchestrator = fixture.orchestrator(SnapshotConfig::default());
        orchestrator.get_snapshot("AAPL").await.unwrap();

        let result = orchestrator
            .get_snapshots_batch(&["AAPL"], BatchOptions::new().bypass_cache(true))
            .await;

        assert_eq!(result.metadata.cached, 0);
        assert_eq!(fixture.market.bars_calls(), 2);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let fixture = Fixture::full();
        let orchestrator = fixture.orchestrator(SnapshotConfig::default());
        orchestrator.get_snapshot("AMD").await.unwrap();
        let (events, options) = recorder();
        let symbols = ["AAPL", "AMD", "GOOG", "META", "MSFT", "NVDA", "TSLA"];

        orchestrator
            .get_snapshots_batch(&symbols, options.concurrency(3))
            .await;

        let events = events.lock();
        assert!(!events.is_empty());
        for pair in events.windows(2) {
            assert!(pair[1].completed >= pair[0].completed);
            assert!(pair[1].cached >= pair[0].cached);
            assert!(pair[1].failed >= pair[0].failed);
        }
        let last = events.last().unwrap();
        assert_eq!(last.total, 7);
        assert_eq!(last.completed, 7);
        assert_eq!(last.cached, 1);
        // one cache event, one per dispatched symbol, one per chunk
        assert_eq!(events.len(), 1 + 6 + 2);
    }

    #[tokio::test]
    async fn test_failed_symbol_gets_placeholder() {
        let fixture = Fixture::with_market(StubMarketData::new(60).panicking_on("BOOM"));
        let orchestrator = fixture.orchestrator(SnapshotConfig::default());
        let (events, options) = recorder();

        let result = orchestrator
            .get_snapshots_batch(&["AAPL", "BOOM", "MSFT"], options)
            .await;

        assert_eq!(result.snapshots.len(), 3);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors["BOOM"].contains("pipeline"));
        let placeholder = &result.snapshots["BOOM"];
        assert_eq!(placeholder.metadata.data_quality, DataQuality::Stale);
        assert_eq!(placeholder.market.bar_count, 0);

        assert_eq!(result.metadata.total, 3);
        assert_eq!(result.metadata.failed, 1);
        assert_eq!(result.metadata.successful, 2);
        assert_eq!(events.lock().last().unwrap().failed, 1);
        assert!(result.snapshots["AAPL"].price.rsi_14.is_some());
    }

    #[tokio::test]
    async fn test_blank_symbol_is_reported() {
        let fixture = Fixture::full();
        let orchestrator = fixture.orchestrator(SnapshotConfig::default());

        let result = orchestrator
            .get_snapshots_batch(&["AAPL", "  "], BatchOptions::new())
            .await;

        assert_eq!(result.metadata.failed, 1);
        assert!(result.errors.contains_key(""));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let fixture = Fixture::with_market(
            StubMarketData::new(60).with_delay(Duration::from_millis(100)),
        );
        let config = SnapshotConfig::builder().batch_concurrency(3).build().unwrap();
        let orchestrator = fixture.orchestrator(config);
        let symbols: Vec<String> = (0..7).map(|i| format!("SYM{i}")).collect();

        let result = orchestrator
            .get_snapshots_batch(&symbols, BatchOptions::new())
            .await;

        assert_eq!(result.metadata.successful, 7);
        assert_eq!(fixture.market.max_in_flight.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_override() {
        let fixture = Fixture::with_market(
            StubMarketData::new(60).with_delay(Duration::from_millis(100)),
        );
        let orchestrator = fixture.orchestrator(SnapshotConfig::default());
        let symbols = ["A", "B", "C", "D"];

        orchestrator
            .get_snapshots_batch(&symbols, BatchOptions::new().concurrency(1))
            .await;

        assert_eq!(fixture.market.max_in_flight.load(Ordering::SeqCst), 1);
    }
}
