//! Reference indicator calculators
//!
//! Default implementations of the calculator contracts in
//! [`providers`](crate::providers). Any of them can be swapped out through
//! the orchestrator builder.

pub mod liquidity;
pub mod options;
pub mod price;

pub use liquidity::BarLiquidityCalculator;
pub use options::TimeoutOptionsCalculator;
pub use price::TaPriceCalculator;
