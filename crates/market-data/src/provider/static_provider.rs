//! In-memory provider with seeded prices.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::warn;
use rust_decimal::Decimal;

use crate::errors::MarketDataError;
use crate::models::{fx_symbol, DailyPrice, Quote};
use crate::provider::MarketDataProvider;

const PROVIDER_ID: &str = "STATIC";

/// Serves prices seeded up front. The latest quote of a symbol is its last
/// seeded close; the close before it is the previous close.
pub struct StaticProvider {
    currency: String,
    prices: RwLock<HashMap<String, BTreeMap<NaiveDate, Decimal>>>,
}

impl StaticProvider {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            prices: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, BTreeMap<NaiveDate, Decimal>>> {
        self.prices.read().unwrap_or_else(|poisoned| {
            warn!("Static price table lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, BTreeMap<NaiveDate, Decimal>>> {
        self.prices.write().unwrap_or_else(|poisoned| {
            warn!("Static price table lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn set_price(&self, symbol: &str, date: NaiveDate, close: Decimal) {
        self.write()
            .entry(symbol.to_uppercase())
            .or_default()
            .insert(date, close);
    }

    /// Builder form of [`set_price`](Self::set_price).
    pub fn with_price(self, symbol: &str, date: NaiveDate, close: Decimal) -> Self {
        self.set_price(symbol, date, close);
        self
    }

    /// Seeds an FX rate under its `{FROM}{TO}=X` pair.
    pub fn with_rate(self, from: &str, to: &str, date: NaiveDate, rate: Decimal) -> Self {
        self.set_price(&fx_symbol(from, to), date, rate);
        self
    }
}

#[async_trait]
impl MarketDataProvider for StaticProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn get_latest_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let prices = self.read();
        let series = prices
            .get(&symbol.to_uppercase())
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;
        let mut latest_first = series.iter().rev();
        let (date, close) = latest_first
            .next()
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        let timestamp = date
            .and_hms_opt(21, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now);
        let mut quote = Quote::new(
            symbol,
            timestamp,
            *close,
            self.currency.clone(),
            PROVIDER_ID.to_string(),
        );
        quote.previous_close = latest_first.next().map(|(_, prev)| *prev);
        Ok(quote)
    }

    async fn get_historical_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPrice>, MarketDataError> {
        let prices = self.read();
        let series = prices
            .get(&symbol.to_uppercase())
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;
        if start > end {
            return Err(MarketDataError::NoDataForRange);
        }
        let history: Vec<DailyPrice> = series
            .range(start..=end)
            .map(|(date, close)| DailyPrice::close_only(symbol, *date, *close))
            .collect();
        if history.is_empty() {
            return Err(MarketDataError::NoDataForRange);
        }
        Ok(history)
    }

    async fn get_exchange_rate(&self, from: &str, to: &str) -> Result<Decimal, MarketDataError> {
        if from.eq_ignore_ascii_case(to) {
            return Ok(Decimal::ONE);
        }
        Ok(self.get_latest_quote(&fx_symbol(from, to)).await?.close)
    }
}
