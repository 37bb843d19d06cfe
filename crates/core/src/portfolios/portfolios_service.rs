use async_trait::async_trait;
use chrono::Utc;
use log::info;
use std::sync::Arc;

use super::portfolios_access::PortfolioAccess;
use super::portfolios_model::{NewPortfolio, Portfolio, PortfolioUpdate};
use super::portfolios_traits::{PortfolioRepositoryTrait, PortfolioServiceTrait};
use crate::errors::{Error, Result};
use crate::transactions::{LedgerWrite, LedgerWriter};

/// Owner-scoped portfolio CRUD.
pub struct PortfolioService {
    access: PortfolioAccess,
    repository: Arc<dyn PortfolioRepositoryTrait>,
    writer: LedgerWriter,
}

impl PortfolioService {
    pub fn new(access: PortfolioAccess, writer: LedgerWriter) -> Self {
        let repository = access.repository().clone();
        Self {
            access,
            repository,
            writer,
        }
    }

    fn ensure_unique_name(&self, owner_id: &str, name: &str, except_id: Option<&str>) -> Result<()> {
        let taken = self
            .repository
            .list_by_owner(owner_id)?
            .iter()
            .any(|p| p.name == name && Some(p.id.as_str()) != except_id);
        if taken {
            return Err(Error::Conflict(format!(
                "a portfolio named '{}' already exists",
                name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PortfolioServiceTrait for PortfolioService {
    async fn create_portfolio(
        &self,
        user_id: &str,
        new_portfolio: NewPortfolio,
    ) -> Result<Portfolio> {
        if user_id.trim().is_empty() {
            return Err(Error::Unauthorized);
        }
        let mut new_portfolio = new_portfolio;
        new_portfolio.owner_id = user_id.to_string();
        new_portfolio.validate()?;
        new_portfolio.name = new_portfolio.name.trim().to_string();
        new_portfolio.base_currency = new_portfolio.base_currency.trim().to_uppercase();
        if new_portfolio.id.is_none() {
            new_portfolio.id = Some(uuid::Uuid::new_v4().to_string());
        }
        self.ensure_unique_name(user_id, &new_portfolio.name, None)?;

        let created = self.repository.create(new_portfolio).await?;
        info!("Created portfolio {} for user {}", created.id, user_id);
        Ok(created)
    }

    async fn update_portfolio(
        &self,
        user_id: &str,
        portfolio_update: PortfolioUpdate,
    ) -> Result<Portfolio> {
        portfolio_update.validate()?;
        let (current, _guard) = self
            .access
            .authorize_for_write(user_id, &portfolio_update.id)
            .await?;
        let name = portfolio_update.name.trim().to_string();
        self.ensure_unique_name(user_id, &name, Some(&current.id))?;

        if portfolio_update.cost_basis_method == current.cost_basis_method {
            return self
                .repository
                .update(PortfolioUpdate {
                    name,
                    ..portfolio_update
                })
                .await;
        }

        let updated = Portfolio {
            name,
            cost_basis_method: portfolio_update.cost_basis_method,
            updated_at: Utc::now().naive_utc(),
            ..current.clone()
        };
        self.writer
            .apply(
                &current,
                LedgerWrite::new(&current.id).with_portfolio_update(updated.clone()),
            )
            .await?;
        info!(
            "Portfolio {} switched from {} to {}; projections replayed",
            current.id, current.cost_basis_method, updated.cost_basis_method
        );
        Ok(updated)
    }

    async fn delete_portfolio(&self, user_id: &str, portfolio_id: &str) -> Result<()> {
        let (_portfolio, guard) = self.access.authorize_for_write(user_id, portfolio_id).await?;
        self.repository.delete(portfolio_id).await?;
        drop(guard);
        self.access.locks().forget(portfolio_id);
        info!("Deleted portfolio {}", portfolio_id);
        Ok(())
    }

    fn get_portfolio(&self, user_id: &str, portfolio_id: &str) -> Result<Portfolio> {
        self.access.authorize(user_id, portfolio_id)
    }

    fn list_portfolios(&self, user_id: &str) -> Result<Vec<Portfolio>> {
        if user_id.trim().is_empty() {
            return Err(Error::Unauthorized);
        }
        self.repository.list_by_owner(user_id)
    }
}
