//! Market data provider trait definitions.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::errors::MarketDataError;
use crate::models::{fx_symbol, DailyPrice, Quote};

/// Trait for market data providers.
///
/// Implement this trait to add support for a new market data source. Providers
/// are stateless with respect to caching; the [`CachedMarketData`](crate::CachedMarketData)
/// client sits in front of them.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Should be a constant string like "YAHOO" or "STATIC".
    fn id(&self) -> &'static str;

    /// Fetch the latest quote for a symbol.
    async fn get_latest_quote(&self, symbol: &str) -> Result<Quote, MarketDataError>;

    /// Fetch daily prices for `[start, end]`, ordered by date ascending.
    async fn get_historical_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPrice>, MarketDataError>;

    /// Units of `to` per unit of `from`.
    ///
    /// Default implementation quotes the `{FROM}{TO}=X` pair.
    async fn get_exchange_rate(&self, from: &str, to: &str) -> Result<Decimal, MarketDataError> {
        let quote = self.get_latest_quote(&fx_symbol(from, to)).await?;
        Ok(quote.close)
    }
}
