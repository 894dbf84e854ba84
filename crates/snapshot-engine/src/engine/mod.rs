//! Snapshot engine
//!
//! Orchestrates market data, calculators and repositories into snapshots,
//! with cache read-through and a bounded batch runner.

pub mod batch;
mod categories;
pub mod orchestrator;
pub mod quality;

pub use batch::{BatchMetadata, BatchOptions, BatchProgress, BatchResult, ProgressCallback};
pub use orchestrator::{SnapshotOrchestrator, SnapshotOrchestratorBuilder};
