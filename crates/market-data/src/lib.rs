//! FolioLedger Market Data Crate
//!
//! Provider-agnostic market data for the accounting core: latest quotes,
//! daily price history and FX rates, behind an in-memory TTL cache.
//!
//! # Core Types
//!
//! - [`MarketDataAdapter`] - The contract the core consumes
//! - [`CachedMarketData`] - TTL-cached adapter over one provider
//! - [`MarketDataProvider`] - Implemented by [`YahooProvider`] and [`StaticProvider`]
//! - [`Quote`] / [`DailyPrice`] - Market data records

pub mod cache;
pub mod client;
pub mod errors;
pub mod models;
pub mod provider;

pub use client::{CacheConfig, CachedMarketData, MarketDataAdapter};
pub use errors::{MarketDataError, RetryClass};
pub use models::{fx_symbol, DailyPrice, Quote};
pub use provider::yahoo::YahooProvider;
pub use provider::{MarketDataProvider, StaticProvider};
