//! Chart API client for daily closes of the ETF and the index.

use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{debug, warn};

use crate::hedging::HedgeConfig;
use crate::metrics::IndicatorCalculator;

use super::types::ChartResponse;
use super::{MarketData, MarketDataError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_RETRY_ELAPSED: Duration = Duration::from_secs(20);
const USER_AGENT: &str = "Mozilla/5.0";

/// Range used for the latest-close lookup; two sessions cover a closed market.
const LATEST_RANGE: &str = "2d";

/// Client for the chart API (read-only).
#[derive(Debug, Clone)]
pub struct MarketDataClient {
    client: Client,
    base_url: String,
    history_range: String,
}

impl MarketDataClient {
    /// Create a client from the hedge configuration.
    pub fn new(config: &HedgeConfig) -> Result<Self, MarketDataError> {
        Self::with_base_url(config.market_data_url.clone(), config.history_range.clone())
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(base_url: String, history_range: String) -> Result<Self, MarketDataError> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| MarketDataError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            history_range,
        })
    }

    fn chart_url(&self, ticker: &str) -> String {
        format!("{}/{}", self.base_url, encode_ticker(ticker))
    }

    /// Fetch daily closes for `ticker` over `range`, oldest first.
    pub async fn fetch_daily_closes(
        &self,
        ticker: &str,
        range: &str,
    ) -> Result<Vec<Decimal>, MarketDataError> {
        let url = self.chart_url(ticker);
        debug!(url = %url, range = %range, "Fetching daily closes");

        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(MAX_RETRY_ELAPSED),
            ..Default::default()
        };

        let response: ChartResponse = retry(backoff, || async {
            let response = self
                .client
                .get(&url)
                .query(&[("range", range), ("interval", "1d")])
                .send()
                .await
                .map_err(|e| backoff::Error::transient(MarketDataError::Network(e.to_string())))?;

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                warn!(status = status.as_u16(), ticker = %ticker, "Chart request failed, retrying");
                return Err(backoff::Error::transient(MarketDataError::Http {
                    status: status.as_u16(),
                    message: "Rate limited or server error".to_string(),
                }));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(backoff::Error::permanent(MarketDataError::Http {
                    status: status.as_u16(),
                    message: body,
                }));
            }

            response
                .json::<ChartResponse>()
                .await
                .map_err(|e| backoff::Error::permanent(MarketDataError::Parse(e.to_string())))
        })
        .await?;

        if let Some(err) = response.chart.error {
            return Err(MarketDataError::Http {
                status: 404,
                message: format!("{}: {}", err.code, err.description),
            });
        }

        let closes = response
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .map(|data| data.closes())
            .unwrap_or_default();

        if closes.is_empty() {
            return Err(MarketDataError::Empty(ticker.to_string()));
        }

        debug!(ticker = %ticker, count = closes.len(), "Fetched daily closes");
        Ok(closes)
    }
}

#[async_trait]
impl MarketData for MarketDataClient {
    async fn fetch_latest_price(&self, ticker: &str) -> Result<Decimal, MarketDataError> {
        let closes = self.fetch_daily_closes(ticker, LATEST_RANGE).await?;
        closes
            .last()
            .map(|c| c.round_dp(2))
            .ok_or_else(|| MarketDataError::Empty(ticker.to_string()))
    }

    async fn fetch_latest_price_and_moving_average(
        &self,
        ticker: &str,
        period_days: u32,
    ) -> Result<(Decimal, Decimal), MarketDataError> {
        let closes = self.fetch_daily_closes(ticker, &self.history_range).await?;

        IndicatorCalculator::latest_with_moving_average(&closes, period_days as usize).ok_or(
            MarketDataError::InsufficientHistory {
                required: period_days,
                available: closes.len(),
            },
        )
    }
}

/// Percent-encode characters that index tickers use (`^TWII`).
fn encode_ticker(ticker: &str) -> String {
    ticker.replace('^', "%5E")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_url_encodes_index_ticker() {
        let client = MarketDataClient::with_base_url(
            "http://localhost:1/chart/".to_string(),
            "6mo".to_string(),
        )
        .unwrap();

        assert_eq!(client.chart_url("^TWII"), "http://localhost:1/chart/%5ETWII");
        assert_eq!(client.chart_url("00631L.TW"), "http://localhost:1/chart/00631L.TW");
    }
}
