use async_trait::async_trait;

use super::holdings_model::{Holding, HoldingView};
use crate::errors::Result;
use crate::portfolio::tax_lots::{RealizedGain, TaxLot};

/// Read access to the persisted projection rows.
///
/// Rows are written only through the ledger commit path.
pub trait HoldingRepositoryTrait: Send + Sync {
    fn list_holdings(&self, portfolio_id: &str) -> Result<Vec<Holding>>;

    /// Open and closed lots, optionally for one symbol, ordered by acquisition date.
    fn list_lots(&self, portfolio_id: &str, symbol: Option<&str>) -> Result<Vec<TaxLot>>;

    fn list_realized_gains(&self, portfolio_id: &str) -> Result<Vec<RealizedGain>>;

    /// Portfolios that have ever held a lot of `symbol`.
    fn list_lot_holders(&self, symbol: &str) -> Result<Vec<String>>;

    /// Distinct symbols with a non-zero holding in any portfolio.
    fn list_held_symbols(&self) -> Result<Vec<String>>;
}

#[async_trait]
pub trait HoldingsServiceTrait: Send + Sync {
    /// Holdings of a portfolio, optionally enriched with market-price fields.
    async fn get_holdings(
        &self,
        user_id: &str,
        portfolio_id: &str,
        enrich: bool,
    ) -> Result<Vec<HoldingView>>;
}
