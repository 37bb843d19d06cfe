use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Market data quote
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,

    /// Timestamp of the quote
    pub timestamp: DateTime<Utc>,

    /// Opening price (optional for intraday)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,

    /// High price (optional for intraday)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,

    /// Low price (optional for intraday)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,

    /// Closing/current price (required)
    pub close: Decimal,

    /// Previous session's close, used for day change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_close: Option<Decimal>,

    /// Trading volume (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,

    /// Quote currency
    pub currency: String,

    /// Source of the quote (YAHOO, STATIC, etc.)
    pub source: String,
}

impl Quote {
    /// Create a new quote with minimal required fields
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        close: Decimal,
        currency: String,
        source: String,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            open: None,
            high: None,
            low: None,
            close,
            previous_close: None,
            volume: None,
            currency,
            source,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Absolute change against the previous close, when known.
    pub fn day_change(&self) -> Option<Decimal> {
        self.previous_close.map(|prev| self.close - prev)
    }
}

/// One trading day of a symbol's price history (OHLCV).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPrice {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Decimal,
    pub volume: Option<Decimal>,
}

impl DailyPrice {
    pub fn close_only(symbol: impl Into<String>, date: NaiveDate, close: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }
}

/// Yahoo style FX pair symbol, e.g. `EURUSD=X`.
pub fn fx_symbol(from: &str, to: &str) -> String {
    format!("{}{}=X", from.to_uppercase(), to.to_uppercase())
}
