use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use std::sync::Arc;
use uuid::Uuid;

use folioledger_core::errors::Error;
use folioledger_core::portfolios::{
    NewPortfolio, Portfolio, PortfolioRepositoryTrait, PortfolioUpdate,
};
use folioledger_core::Result;

use super::model::PortfolioDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::portfolios;
use crate::schema::portfolios::dsl::*;

pub struct PortfolioRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl PortfolioRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        PortfolioRepository { pool, writer }
    }

    fn load(&self, rows: Vec<PortfolioDB>) -> Result<Vec<Portfolio>> {
        rows.into_iter()
            .map(|row| Portfolio::try_from(row).into_core())
            .collect()
    }
}

#[async_trait]
impl PortfolioRepositoryTrait for PortfolioRepository {
    async fn create(&self, new_portfolio: NewPortfolio) -> Result<Portfolio> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Portfolio> {
                let now = Utc::now().naive_utc();
                let row = PortfolioDB {
                    id: new_portfolio
                        .id
                        .filter(|value| !value.trim().is_empty())
                        .unwrap_or_else(|| Uuid::new_v4().to_string()),
                    owner_id: new_portfolio.owner_id,
                    name: new_portfolio.name.trim().to_string(),
                    base_currency: new_portfolio.base_currency.trim().to_uppercase(),
                    cost_basis_method: new_portfolio.cost_basis_method.as_str().to_string(),
                    created_at: now,
                    updated_at: now,
                };
                let result_db = diesel::insert_into(portfolios::table)
                    .values(&row)
                    .returning(PortfolioDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok(Portfolio::try_from(result_db)?)
            })
            .await
    }

    async fn update(&self, portfolio_update: PortfolioUpdate) -> Result<Portfolio> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Portfolio> {
                let updated = diesel::update(portfolios.find(&portfolio_update.id))
                    .set((
                        name.eq(portfolio_update.name.trim()),
                        cost_basis_method.eq(portfolio_update.cost_basis_method.as_str()),
                        updated_at.eq(Utc::now().naive_utc()),
                    ))
                    .returning(PortfolioDB::as_returning())
                    .get_result(conn)
                    .optional()
                    .map_err(StorageError::from)?
                    .ok_or_else(|| Error::not_found("Portfolio", portfolio_update.id.clone()))?;
                Ok(Portfolio::try_from(updated)?)
            })
            .await
    }

    async fn delete(&self, portfolio_id: &str) -> Result<usize> {
        let target = portfolio_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Ok(diesel::delete(portfolios.find(target))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }

    fn get_by_id(&self, portfolio_id: &str) -> Result<Option<Portfolio>> {
        let mut conn = get_connection(&self.pool)?;
        portfolios
            .find(portfolio_id)
            .select(PortfolioDB::as_select())
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .map(|row| Portfolio::try_from(row).into_core())
            .transpose()
    }

    fn list_by_owner(&self, owner: &str) -> Result<Vec<Portfolio>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = portfolios
            .filter(owner_id.eq(owner))
            .order((created_at.asc(), id.asc()))
            .select(PortfolioDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?;
        self.load(rows)
    }

    fn list_all(&self) -> Result<Vec<Portfolio>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = portfolios
            .order(id.asc())
            .select(PortfolioDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?;
        self.load(rows)
    }
}
