//! Market-data collaborator: chart API client, TTL cache, and the `MarketData` seam.

mod cache;
mod data_client;
#[cfg(test)]
mod mock;
mod types;

pub use cache::{CachedMarketData, QuoteKey, TtlCache};
pub use data_client::MarketDataClient;
#[cfg(test)]
pub use mock::MockMarketData;
pub use types::*;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

/// Source of latest prices and moving averages.
///
/// Every error means the value is unavailable; callers fall back to the
/// last-known or default value and mark it unverified.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Last available close for a ticker.
    async fn fetch_latest_price(&self, ticker: &str) -> Result<Decimal, MarketDataError>;

    /// Latest close and its trailing simple moving average over `period_days` closes.
    async fn fetch_latest_price_and_moving_average(
        &self,
        ticker: &str,
        period_days: u32,
    ) -> Result<(Decimal, Decimal), MarketDataError>;
}

/// Why a quote could not be produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarketDataError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Failed to parse response: {0}")]
    Parse(String),
    #[error("No data returned for {0}")]
    Empty(String),
    #[error("Need {required} closes for the moving average, only {available} available")]
    InsufficientHistory { required: u32, available: usize },
}
