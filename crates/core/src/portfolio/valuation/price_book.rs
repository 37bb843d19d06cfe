use chrono::{Duration, NaiveDate};
use log::warn;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

use folioledger_market_data::MarketDataAdapter;

use crate::constants::PRICE_FALLBACK_DAYS;

/// Daily closes per symbol, with the last-known-close fallback.
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    closes: HashMap<String, BTreeMap<NaiveDate, Decimal>>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches daily history for `symbols` over `[start - fallback, end]`.
    /// Symbols whose history cannot be fetched are left empty and fall back to cost.
    pub async fn load(
        market_data: &dyn MarketDataAdapter,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        let mut book = PriceBook::new();
        let from = start - Duration::days(PRICE_FALLBACK_DAYS);
        for symbol in symbols {
            match market_data.get_historical_prices(symbol, from, end).await {
                Ok(prices) => {
                    for price in prices {
                        book.insert(symbol, price.date, price.close);
                    }
                }
                Err(e) => warn!(
                    "No price history for {} between {} and {}: {}",
                    symbol, from, end, e
                ),
            }
        }
        book
    }

    pub fn insert(&mut self, symbol: &str, date: NaiveDate, close: Decimal) {
        self.closes
            .entry(symbol.to_string())
            .or_default()
            .insert(date, close);
    }

    /// Close on `date`, or the most recent close at most the fallback window earlier.
    pub fn price_on(&self, symbol: &str, date: NaiveDate) -> Option<(NaiveDate, Decimal)> {
        let earliest = date - Duration::days(PRICE_FALLBACK_DAYS);
        self.closes
            .get(symbol)?
            .range(earliest..=date)
            .next_back()
            .map(|(d, close)| (*d, *close))
    }

    pub fn is_empty(&self) -> bool {
        self.closes.values().all(BTreeMap::is_empty)
    }
}
