//! The market data surface the accounting core consumes.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::Decimal;

use crate::cache::{CacheLookup, TtlCache};
use crate::errors::MarketDataError;
use crate::models::{DailyPrice, Quote};
use crate::provider::MarketDataProvider;

/// Quotes, daily history and FX rates, with a cache in front of the provider.
#[async_trait]
pub trait MarketDataAdapter: Send + Sync {
    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError>;

    /// Quotes for every symbol that could be priced. Failures are logged and omitted.
    async fn get_quotes(&self, symbols: &[String]) -> HashMap<String, Quote>;

    async fn get_historical_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPrice>, MarketDataError>;

    /// Units of `to` per unit of `from`; 1 when the currencies match.
    async fn get_exchange_rate(&self, from: &str, to: &str) -> Result<Decimal, MarketDataError>;

    fn clear_cache(&self);
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime of cached quotes, histories and rates.
    pub ttl: Duration,
    /// Deadline for a single provider call.
    pub request_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            request_timeout: Duration::from_secs(30),
        }
    }
}

type HistoryKey = (String, NaiveDate, NaiveDate);

/// [`MarketDataAdapter`] over a single provider with TTL caching.
///
/// Transient provider failures are answered from an expired cache entry when
/// one exists.
pub struct CachedMarketData {
    provider: Arc<dyn MarketDataProvider>,
    config: CacheConfig,
    quotes: TtlCache<String, Quote>,
    history: TtlCache<HistoryKey, Vec<DailyPrice>>,
    rates: TtlCache<(String, String), Decimal>,
}

impl CachedMarketData {
    pub fn new(provider: Arc<dyn MarketDataProvider>, config: CacheConfig) -> Self {
        Self {
            provider,
            quotes: TtlCache::new(config.ttl),
            history: TtlCache::new(config.ttl),
            rates: TtlCache::new(config.ttl),
            config,
        }
    }

    pub fn provider_id(&self) -> &'static str {
        self.provider.id()
    }

    async fn with_deadline<T, F>(&self, call: F) -> Result<T, MarketDataError>
    where
        F: Future<Output = Result<T, MarketDataError>> + Send,
    {
        tokio::time::timeout(self.config.request_timeout, call)
            .await
            .map_err(|_| MarketDataError::Timeout {
                provider: self.provider.id().to_string(),
            })?
    }

    /// Serves `lookup` when fresh; otherwise fetches, falling back to a stale
    /// value on transient errors.
    fn resolve<T>(
        what: &str,
        lookup: CacheLookup<T>,
        fetched: Result<T, MarketDataError>,
    ) -> Result<T, MarketDataError> {
        match (fetched, lookup) {
            (Ok(value), _) => Ok(value),
            (Err(e), CacheLookup::Stale(value)) if e.is_transient() => {
                warn!("Serving stale market data for {} after error: {}", what, e);
                Ok(value)
            }
            (Err(e), _) => Err(e),
        }
    }
}

#[async_trait]
impl MarketDataAdapter for CachedMarketData {
    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let key = symbol.to_uppercase();
        let lookup = self.quotes.lookup(&key);
        if let CacheLookup::Fresh(quote) = lookup {
            return Ok(quote);
        }
        debug!("Quote cache miss for {}", key);

        let fetched = self
            .with_deadline(self.provider.get_latest_quote(&key))
            .await;
        if let Ok(quote) = &fetched {
            self.quotes.insert(key.clone(), quote.clone());
        }
        Self::resolve(&key, lookup, fetched)
    }

    async fn get_quotes(&self, symbols: &[String]) -> HashMap<String, Quote> {
        let mut quotes = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            match self.get_quote(symbol).await {
                Ok(quote) => {
                    quotes.insert(symbol.clone(), quote);
                }
                Err(e) => warn!("No quote for {}: {}", symbol, e),
            }
        }
        quotes
    }

    async fn get_historical_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPrice>, MarketDataError> {
        if start > end {
            return Err(MarketDataError::ValidationFailed {
                message: format!("start {} is after end {}", start, end),
            });
        }
        let key = (symbol.to_uppercase(), start, end);
        let lookup = self.history.lookup(&key);
        if let CacheLookup::Fresh(history) = lookup {
            return Ok(history);
        }

        let fetched = self
            .with_deadline(self.provider.get_historical_prices(&key.0, start, end))
            .await;
        if let Ok(history) = &fetched {
            self.history.insert(key.clone(), history.clone());
        }
        Self::resolve(&key.0, lookup, fetched)
    }

    async fn get_exchange_rate(&self, from: &str, to: &str) -> Result<Decimal, MarketDataError> {
        let key = (from.to_uppercase(), to.to_uppercase());
        if key.0 == key.1 {
            return Ok(Decimal::ONE);
        }
        let lookup = self.rates.lookup(&key);
        if let CacheLookup::Fresh(rate) = lookup {
            return Ok(rate);
        }

        let fetched = self
            .with_deadline(self.provider.get_exchange_rate(&key.0, &key.1))
            .await;
        if let Ok(rate) = &fetched {
            self.rates.insert(key.clone(), *rate);
        }
        Self::resolve(&format!("{}/{}", key.0, key.1), lookup, fetched)
    }

    fn clear_cache(&self) {
        self.quotes.clear();
        self.history.clear();
        self.rates.clear();
        debug!("Market data cache cleared");
    }
}
