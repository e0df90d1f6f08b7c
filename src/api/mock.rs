//! Mock market data for testing without network calls.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{MarketData, MarketDataError};

/// Returns predefined quotes; unknown tickers are reported as empty.
#[derive(Debug, Default)]
pub struct MockMarketData {
    prices: HashMap<String, Decimal>,
    moving_averages: HashMap<(String, u32), (Decimal, Decimal)>,
    calls: AtomicUsize,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, ticker: &str, price: Decimal) -> Self {
        self.prices.insert(ticker.to_string(), price);
        self
    }

    pub fn with_moving_average(
        mut self,
        ticker: &str,
        period_days: u32,
        price: Decimal,
        moving_average: Decimal,
    ) -> Self {
        self.moving_averages
            .insert((ticker.to_string(), period_days), (price, moving_average));
        self
    }

    /// Number of fetches served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketData for MockMarketData {
    async fn fetch_latest_price(&self, ticker: &str) -> Result<Decimal, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prices
            .get(ticker)
            .copied()
            .ok_or_else(|| MarketDataError::Empty(ticker.to_string()))
    }

    async fn fetch_latest_price_and_moving_average(
        &self,
        ticker: &str,
        period_days: u32,
    ) -> Result<(Decimal, Decimal), MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.moving_averages
            .get(&(ticker.to_string(), period_days))
            .copied()
            .ok_or(MarketDataError::InsufficientHistory {
                required: period_days,
                available: 0,
            })
    }
}
