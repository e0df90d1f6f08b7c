//! Response types for the chart API (`/v8/finance/chart/{ticker}`).

use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResponse {
    pub chart: ChartEnvelope,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartEnvelope {
    #[serde(default)]
    pub result: Option<Vec<ChartData>>,
    #[serde(default)]
    pub error: Option<ChartError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartError {
    pub code: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartData {
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Option<Vec<i64>>,
    pub indicators: Indicators,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub symbol: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub regular_market_price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteSeries>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteSeries {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

impl ChartData {
    /// Daily closes in chronological order, skipping sessions with no print.
    pub fn closes(&self) -> Vec<Decimal> {
        self.indicators
            .quote
            .first()
            .map(|q| {
                q.close
                    .iter()
                    .flatten()
                    .filter(|c| c.is_finite())
                    .filter_map(|c| Decimal::try_from(*c).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}
