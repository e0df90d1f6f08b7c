//! Time-to-live cache for market-data quotes.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::hash::Hash;
use tokio::sync::Mutex;
use tracing::debug;

use super::{MarketData, MarketDataError};

/// Map whose entries expire `ttl` after insertion.
///
/// The caller supplies `now` on every access.
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, (V, DateTime<Utc>)>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Fresh value for `key`, evicting it if it has expired.
    pub fn get(&mut self, key: &K, now: DateTime<Utc>) -> Option<V> {
        let fresh = match self.entries.get(key) {
            Some((_, stored_at)) => now - *stored_at < self.ttl,
            None => return None,
        };

        if fresh {
            self.entries.get(key).map(|(value, _)| value.clone())
        } else {
            self.entries.remove(key);
            None
        }
    }

    pub fn insert(&mut self, key: K, value: V, now: DateTime<Utc>) {
        self.entries.insert(key, (value, now));
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, (_, stored_at)| now - *stored_at < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Cache key: ticker plus moving-average period (0 for a plain price).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuoteKey {
    pub ticker: String,
    pub period_days: u32,
}

impl QuoteKey {
    pub fn price(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            period_days: 0,
        }
    }

    pub fn moving_average(ticker: &str, period_days: u32) -> Self {
        Self {
            ticker: ticker.to_string(),
            period_days,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CachedQuote {
    Price(Decimal),
    WithMovingAverage(Decimal, Decimal),
}

/// `MarketData` wrapper serving quotes from a TTL cache. Failures are not cached.
pub struct CachedMarketData<S> {
    inner: S,
    cache: Mutex<TtlCache<QuoteKey, CachedQuote>>,
}

impl<S: MarketData> CachedMarketData<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Mutex::new(TtlCache::new(ttl)),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn store(&self, key: QuoteKey, quote: CachedQuote) {
        let now = Utc::now();
        let mut cache = self.cache.lock().await;
        cache.purge_expired(now);
        cache.insert(key, quote, now);
    }

    /// Forget every cached quote so the next call fetches live.
    pub async fn invalidate(&self) {
        self.cache.lock().await.clear();
    }
}

#[async_trait]
impl<S: MarketData> MarketData for CachedMarketData<S> {
    async fn fetch_latest_price(&self, ticker: &str) -> Result<Decimal, MarketDataError> {
        let key = QuoteKey::price(ticker);

        if let Some(CachedQuote::Price(price)) = self.cache.lock().await.get(&key, Utc::now()) {
            debug!(ticker = %ticker, "Price served from cache");
            return Ok(price);
        }

        let price = self.inner.fetch_latest_price(ticker).await?;
        self.store(key, CachedQuote::Price(price)).await;
        Ok(price)
    }

    async fn fetch_latest_price_and_moving_average(
        &self,
        ticker: &str,
        period_days: u32,
    ) -> Result<(Decimal, Decimal), MarketDataError> {
        let key = QuoteKey::moving_average(ticker, period_days);

        if let Some(CachedQuote::WithMovingAverage(price, ma)) =
            self.cache.lock().await.get(&key, Utc::now())
        {
            debug!(ticker = %ticker, period_days, "Moving average served from cache");
            return Ok((price, ma));
        }

        let (price, ma) = self
            .inner
            .fetch_latest_price_and_moving_average(ticker, period_days)
            .await?;
        self.store(key, CachedQuote::WithMovingAverage(price, ma)).await;
        Ok((price, ma))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockMarketData;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_entry_fresh_within_ttl() {
        let mut cache = TtlCache::new(Duration::minutes(10));
        cache.insert("^TWII", 19500, t0());

        assert_eq!(cache.get(&"^TWII", t0() + Duration::minutes(9)), Some(19500));
    }

    #[test]
    fn test_entry_expires_at_ttl() {
        let mut cache = TtlCache::new(Duration::minutes(10));
        cache.insert("^TWII", 19500, t0());

        assert_eq!(cache.get(&"^TWII", t0() + Duration::minutes(10)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let mut cache = TtlCache::new(Duration::minutes(10));
        cache.insert("old", 1, t0());
        cache.insert("new", 2, t0() + Duration::minutes(8));

        assert_eq!(cache.purge_expired(t0() + Duration::minutes(12)), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"new", t0() + Duration::minutes(12)), Some(2));
    }

    #[test]
    fn test_keys_distinguish_period() {
        assert_ne!(
            QuoteKey::moving_average("^TWII", 13),
            QuoteKey::moving_average("^TWII", 20)
        );
        assert_ne!(QuoteKey::price("^TWII"), QuoteKey::moving_average("^TWII", 13));
    }

    #[tokio::test]
    async fn test_cached_source_reuses_quote() {
        let mock = MockMarketData::new().with_moving_average("^TWII", 13, dec!(19500), dec!(19000));
        let cached = CachedMarketData::new(mock, Duration::minutes(10));

        let first = cached.fetch_latest_price_and_moving_average("^TWII", 13).await.unwrap();
        let second = cached.fetch_latest_price_and_moving_average("^TWII", 13).await.unwrap();

        assert_eq!(first, (dec!(19500), dec!(19000)));
        assert_eq!(first, second);
        assert_eq!(cached.inner().calls(), 1);
    }

    #[tokio::test]
    async fn test_new_period_fetches_again() {
        let mock = MockMarketData::new()
            .with_moving_average("^TWII", 13, dec!(19500), dec!(19000))
            .with_moving_average("^TWII", 20, dec!(19500), dec!(18800));
        let cached = CachedMarketData::new(mock, Duration::minutes(10));

        cached.fetch_latest_price_and_moving_average("^TWII", 13).await.unwrap();
        let (_, ma) = cached.fetch_latest_price_and_moving_average("^TWII", 20).await.unwrap();

        assert_eq!(ma, dec!(18800));
        assert_eq!(cached.inner().calls(), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_fetches() {
        let mock = MockMarketData::new().with_price("00631L.TW", dec!(48.35));
        let cached = CachedMarketData::new(mock, Duration::zero());

        cached.fetch_latest_price("00631L.TW").await.unwrap();
        cached.fetch_latest_price("00631L.TW").await.unwrap();

        assert_eq!(cached.inner().calls(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cached = CachedMarketData::new(MockMarketData::new(), Duration::minutes(10));

        assert!(cached.fetch_latest_price("00631L.TW").await.is_err());
        assert!(cached.fetch_latest_price("00631L.TW").await.is_err());
        assert_eq!(cached.inner().calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let mock = MockMarketData::new().with_price("00631L.TW", dec!(48.35));
        let cached = CachedMarketData::new(mock, Duration::minutes(10));

        cached.fetch_latest_price("00631L.TW").await.unwrap();
        cached.invalidate().await;
        cached.fetch_latest_price("00631L.TW").await.unwrap();

        assert_eq!(cached.inner().calls(), 2);
    }
}
