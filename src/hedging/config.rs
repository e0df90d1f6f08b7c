//! Hedging configuration.

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::models::ContractSpec;

pub const DEFAULT_MARKET_DATA_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Longest accepted quote cache lifetime (one week).
pub const MAX_CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Configuration for hedge sizing, signals, and market-data plumbing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeConfig {
    /// Leverage embedded in the ETF (2x)
    pub leverage_ratio: Decimal,

    /// Futures contract being used as the hedge
    pub contract: ContractSpec,

    /// Shares per ETF lot
    pub shares_per_lot: u32,

    /// Ticker of the leveraged ETF
    pub etf_ticker: String,

    /// Ticker of the underlying index
    pub index_ticker: String,

    /// Moving-average window for the trend signal (trading days)
    pub ma_days: u32,

    /// History range requested when computing the moving average
    pub history_range: String,

    /// How long fetched quotes stay fresh (seconds)
    pub cache_ttl_secs: u64,

    /// Shown until a live ETF price is loaded
    pub fallback_unit_price: Decimal,

    /// Shown until a live index level is loaded
    pub fallback_index_price: Decimal,

    /// Shown until a live moving average is loaded
    pub fallback_moving_average: Decimal,

    /// Chart API base URL
    pub market_data_url: String,
}

impl Default for HedgeConfig {
    fn default() -> Self {
        Self {
            leverage_ratio: dec!(2.0),
            contract: ContractSpec::MINI_INDEX,
            shares_per_lot: 1000,
            etf_ticker: "00631L.TW".to_string(),
            index_ticker: "^TWII".to_string(),
            ma_days: 13,
            history_range: "6mo".to_string(),
            cache_ttl_secs: 600,               // 10 minutes
            fallback_unit_price: dec!(50.0),
            fallback_index_price: dec!(19500),
            fallback_moving_average: dec!(19000),
            market_data_url: DEFAULT_MARKET_DATA_URL.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl HedgeConfig {
    /// Defaults overridden by `HEDGE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(ticker) = env_map.get("HEDGE_ETF_TICKER") {
            config.etf_ticker = non_empty("HEDGE_ETF_TICKER", ticker)?;
        }
        if let Some(ticker) = env_map.get("HEDGE_INDEX_TICKER") {
            config.index_ticker = non_empty("HEDGE_INDEX_TICKER", ticker)?;
        }
        if let Some(url) = env_map.get("HEDGE_MARKET_DATA_URL") {
            config.market_data_url = non_empty("HEDGE_MARKET_DATA_URL", url)?
                .trim_end_matches('/')
                .to_string();
        }

        if let Some(days) = env_map.get("HEDGE_MA_DAYS") {
            config.ma_days = days
                .parse::<u32>()
                .ok()
                .filter(|d| *d >= 1)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "HEDGE_MA_DAYS".to_string(),
                        format!("must be a positive integer, got {}", days),
                    )
                })?;
        }

        if let Some(ttl) = env_map.get("HEDGE_CACHE_TTL_SECS") {
            config.cache_ttl_secs = ttl
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs <= MAX_CACHE_TTL_SECS)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "HEDGE_CACHE_TTL_SECS".to_string(),
                        format!("must be 0..={} seconds, got {}", MAX_CACHE_TTL_SECS, ttl),
                    )
                })?;
        }

        Ok(config)
    }

    /// Quote cache lifetime.
    pub fn cache_ttl(&self) -> Duration {
        Duration::seconds(self.cache_ttl_secs.min(MAX_CACHE_TTL_SECS) as i64)
    }
}

fn non_empty(key: &str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            "must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = HedgeConfig::from_env_map(HashMap::new()).unwrap();
        assert_eq!(config.leverage_ratio, dec!(2.0));
        assert_eq!(config.contract.point_value, dec!(50));
        assert_eq!(config.shares_per_lot, 1000);
        assert_eq!(config.ma_days, 13);
        assert_eq!(config.cache_ttl_secs, 600);
    }

    #[test]
    fn test_env_overrides() {
        let config = HedgeConfig::from_env_map(env(&[
            ("HEDGE_MA_DAYS", "20"),
            ("HEDGE_INDEX_TICKER", "^N225"),
            ("HEDGE_MARKET_DATA_URL", "http://localhost:9000/chart/"),
        ]))
        .unwrap();

        assert_eq!(config.ma_days, 20);
        assert_eq!(config.index_ticker, "^N225");
        assert_eq!(config.market_data_url, "http://localhost:9000/chart");
    }

    #[test]
    fn test_rejects_zero_ma_days() {
        let err = HedgeConfig::from_env_map(env(&[("HEDGE_MA_DAYS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key, _) if key == "HEDGE_MA_DAYS"));
    }

    #[test]
    fn test_rejects_bad_ttl() {
        assert!(HedgeConfig::from_env_map(env(&[("HEDGE_CACHE_TTL_SECS", "soon")])).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_ttl() {
        let err = HedgeConfig::from_env_map(env(&[("HEDGE_CACHE_TTL_SECS", "18446744073709551615")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key, _) if key == "HEDGE_CACHE_TTL_SECS"));

        let config = HedgeConfig::from_env_map(env(&[("HEDGE_CACHE_TTL_SECS", "604800")])).unwrap();
        assert_eq!(config.cache_ttl(), Duration::days(7));
    }
}
