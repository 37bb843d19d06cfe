use async_trait::async_trait;

use super::tax_lots_model::{
    HarvestOpportunity, RealizedGain, SaleAllocation, SaleRequest, TaxLot, TaxReport,
};
use crate::errors::Result;

#[async_trait]
pub trait TaxLotServiceTrait: Send + Sync {
    fn list_lots(
        &self,
        user_id: &str,
        portfolio_id: &str,
        symbol: Option<&str>,
        open_only: bool,
    ) -> Result<Vec<TaxLot>>;

    /// Realized gains, optionally limited to disposals in one calendar year.
    fn list_realized_gains(
        &self,
        user_id: &str,
        portfolio_id: &str,
        year: Option<i32>,
    ) -> Result<Vec<RealizedGain>>;

    /// Runs the sale through a replay without writing anything.
    fn preview_sale_allocation(
        &self,
        user_id: &str,
        portfolio_id: &str,
        request: &SaleRequest,
    ) -> Result<SaleAllocation>;

    /// Records the sale as a SELL entry and returns the gains it realized.
    async fn allocate_sale(
        &self,
        user_id: &str,
        portfolio_id: &str,
        request: SaleRequest,
    ) -> Result<SaleAllocation>;

    async fn harvest_opportunities(
        &self,
        user_id: &str,
        portfolio_id: &str,
    ) -> Result<Vec<HarvestOpportunity>>;

    fn tax_report(&self, user_id: &str, portfolio_id: &str, year: i32) -> Result<TaxReport>;
}
