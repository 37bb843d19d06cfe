//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all providers implement
//! - The Yahoo Finance provider
//! - A static in-memory provider for tests and offline runs

mod static_provider;
mod traits;

pub mod yahoo;

pub use static_provider::StaticProvider;
pub use traits::MarketDataProvider;
