//! Market data clients

pub mod yahoo;

pub use yahoo::YahooMarketData;
