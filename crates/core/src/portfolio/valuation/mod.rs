//! Valuation module - prices a replayed ledger on a given day.

mod price_book;
mod valuation_calculator;
mod valuation_model;
mod valuation_service;

pub use price_book::PriceBook;
pub use valuation_calculator::calculate_valuation;
pub use valuation_model::{PortfolioValuation, PositionValuation, PriceSource};
pub use valuation_service::ValuationService;
