//! Yahoo Finance market data provider.
//!
//! This provider uses the Yahoo Finance API to fetch market data for:
//! - Equities/ETFs (e.g., AAPL, SHOP.TO)
//! - Foreign exchange rates (e.g., EURUSD=X)

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::{debug, warn};
use yahoo_finance_api as yahoo;

use crate::errors::MarketDataError;
use crate::models::{DailyPrice, Quote};
use crate::provider::MarketDataProvider;

const PROVIDER_ID: &str = "YAHOO";

/// Yahoo Finance market data provider.
pub struct YahooProvider {
    connector: yahoo::YahooConnector,
    currency: String,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider. Quotes are tagged with `currency`
    /// since the chart API does not reliably report one.
    pub fn new(currency: impl Into<String>) -> Result<Self, MarketDataError> {
        let connector =
            yahoo::YahooConnector::new().map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to initialize Yahoo connector: {}", e),
            })?;
        Ok(Self {
            connector,
            currency: currency.into(),
        })
    }

    /// Convert a NaiveDate (start of day, UTC) to time::OffsetDateTime for the Yahoo API.
    fn date_to_offset_datetime(date: NaiveDate) -> OffsetDateTime {
        let timestamp = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();
        OffsetDateTime::from_unix_timestamp(timestamp).unwrap_or_else(|_| OffsetDateTime::now_utc())
    }

    fn timestamp_of(quote: &yahoo::Quote) -> Result<DateTime<Utc>, MarketDataError> {
        Utc.timestamp_opt(quote.timestamp as i64, 0)
            .single()
            .ok_or_else(|| MarketDataError::ValidationFailed {
                message: format!("Invalid timestamp: {}", quote.timestamp),
            })
    }

    fn close_of(quote: &yahoo::Quote) -> Result<Decimal, MarketDataError> {
        if !quote.close.is_finite() {
            return Err(MarketDataError::ValidationFailed {
                message: format!("Invalid close price {}", quote.close),
            });
        }
        Decimal::from_f64_retain(quote.close).ok_or_else(|| MarketDataError::ValidationFailed {
            message: format!("Failed to convert close price {} to Decimal", quote.close),
        })
    }

    fn map_error(symbol: &str, error: yahoo::YahooError) -> MarketDataError {
        if matches!(error, yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult) {
            return MarketDataError::SymbolNotFound(symbol.to_string());
        }
        let message = error.to_string();
        if message.contains("429") {
            MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            }
        } else {
            MarketDataError::UpstreamUnavailable {
                provider: PROVIDER_ID.to_string(),
                message,
            }
        }
    }

    fn to_daily_price(symbol: &str, quote: &yahoo::Quote) -> Result<DailyPrice, MarketDataError> {
        Ok(DailyPrice {
            symbol: symbol.to_string(),
            date: Self::timestamp_of(quote)?.date_naive(),
            open: Decimal::from_f64_retain(quote.open),
            high: Decimal::from_f64_retain(quote.high),
            low: Decimal::from_f64_retain(quote.low),
            close: Self::close_of(quote)?,
            volume: Decimal::from_u64(quote.volume),
        })
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn get_latest_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        debug!("Fetching latest quote for {} from Yahoo", symbol);

        // A few days of daily bars give both the latest price and the previous close.
        let response = self
            .connector
            .get_quote_range(symbol, "1d", "5d")
            .await
            .map_err(|e| Self::map_error(symbol, e))?;

        let mut bars = response.quotes().map_err(|e| {
            warn!("No quotes returned for {}: {}", symbol, e);
            MarketDataError::SymbolNotFound(symbol.to_string())
        })?;
        let latest = bars
            .pop()
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        let mut quote = Quote::new(
            symbol,
            Self::timestamp_of(&latest)?,
            Self::close_of(&latest)?,
            self.currency.clone(),
            PROVIDER_ID.to_string(),
        );
        quote.open = Decimal::from_f64_retain(latest.open);
        quote.high = Decimal::from_f64_retain(latest.high);
        quote.low = Decimal::from_f64_retain(latest.low);
        quote.volume = Decimal::from_u64(latest.volume);
        quote.previous_close = bars.last().and_then(|prev| Self::close_of(prev).ok());
        Ok(quote)
    }

    async fn get_historical_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyPrice>, MarketDataError> {
        debug!(
            "Fetching historical prices for {} from {} to {} from Yahoo",
            symbol, start, end
        );

        let start_time = Self::date_to_offset_datetime(start);
        let end_time = Self::date_to_offset_datetime(end + Duration::days(1));

        let response = self
            .connector
            .get_quote_history(symbol, start_time, end_time)
            .await
            .map_err(|e| Self::map_error(symbol, e))?;

        match response.quotes() {
            Ok(yahoo_quotes) => {
                let prices: Vec<DailyPrice> = yahoo_quotes
                    .iter()
                    .filter_map(|q| match Self::to_daily_price(symbol, q) {
                        Ok(price) if price.date >= start && price.date <= end => Some(price),
                        Ok(_) => None,
                        Err(e) => {
                            warn!("Skipping quote due to conversion error: {:?}", e);
                            None
                        }
                    })
                    .collect();

                if prices.is_empty() {
                    return Err(MarketDataError::NoDataForRange);
                }
                Ok(prices)
            }
            Err(yahoo::YahooError::NoQuotes) => {
                warn!(
                    "No historical quotes returned for '{}' between {} and {}",
                    symbol, start, end
                );
                Err(MarketDataError::NoDataForRange)
            }
            Err(e) => Err(Self::map_error(symbol, e)),
        }
    }
}
