//! Portfolio repository and service traits.

use async_trait::async_trait;

use super::portfolios_model::{NewPortfolio, Portfolio, PortfolioUpdate};
use crate::errors::Result;

/// Persistence contract for portfolios.
///
/// Deleting a portfolio cascades to its ledger, projections, proposals,
/// snapshots and import batches.
#[async_trait]
pub trait PortfolioRepositoryTrait: Send + Sync {
    async fn create(&self, new_portfolio: NewPortfolio) -> Result<Portfolio>;
    async fn update(&self, portfolio_update: PortfolioUpdate) -> Result<Portfolio>;
    async fn delete(&self, portfolio_id: &str) -> Result<usize>;
    fn get_by_id(&self, portfolio_id: &str) -> Result<Option<Portfolio>>;
    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Portfolio>>;
    fn list_all(&self) -> Result<Vec<Portfolio>>;
}

#[async_trait]
pub trait PortfolioServiceTrait: Send + Sync {
    async fn create_portfolio(&self, user_id: &str, new_portfolio: NewPortfolio)
        -> Result<Portfolio>;

    /// Updates name and cost-basis method. A method change replays every symbol
    /// of the portfolio and commits the new projection with the portfolio row.
    async fn update_portfolio(
        &self,
        user_id: &str,
        portfolio_update: PortfolioUpdate,
    ) -> Result<Portfolio>;

    async fn delete_portfolio(&self, user_id: &str, portfolio_id: &str) -> Result<()>;
    fn get_portfolio(&self, user_id: &str, portfolio_id: &str) -> Result<Portfolio>;
    fn list_portfolios(&self, user_id: &str) -> Result<Vec<Portfolio>>;
}
