//! Holdings module - derived per-symbol positions and their market enrichment.

mod holdings_model;
mod holdings_service;
mod holdings_traits;

pub use holdings_model::{Holding, HoldingView};
pub use holdings_service::{enrich_holding, HoldingsService};
pub use holdings_traits::{HoldingRepositoryTrait, HoldingsServiceTrait};

#[cfg(test)]
mod holdings_service_tests;
