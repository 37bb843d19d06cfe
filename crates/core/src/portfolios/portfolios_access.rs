//! Owner checks and per-portfolio write serialization.

use dashmap::DashMap;
use log::debug;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::portfolios_model::Portfolio;
use super::portfolios_traits::PortfolioRepositoryTrait;
use crate::errors::{Error, Result};

/// Advisory write locks keyed by portfolio id.
///
/// Every mutation of a portfolio's ledger or projections runs while holding the
/// portfolio's lock. Locks are never taken per symbol: multi-symbol corporate
/// actions would otherwise need ordered acquisition.
#[derive(Clone, Default)]
pub struct PortfolioLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl PortfolioLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, portfolio_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(portfolio_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drops the lock slot of a deleted portfolio.
    pub fn forget(&self, portfolio_id: &str) {
        self.locks.remove(portfolio_id);
    }
}

/// Resolves a portfolio for a caller, denying access before anything it owns is read.
#[derive(Clone)]
pub struct PortfolioAccess {
    repository: Arc<dyn PortfolioRepositoryTrait>,
    locks: PortfolioLocks,
}

impl PortfolioAccess {
    pub fn new(repository: Arc<dyn PortfolioRepositoryTrait>, locks: PortfolioLocks) -> Self {
        Self { repository, locks }
    }

    pub fn authorize(&self, user_id: &str, portfolio_id: &str) -> Result<Portfolio> {
        if user_id.trim().is_empty() {
            return Err(Error::Unauthorized);
        }
        let portfolio = self
            .repository
            .get_by_id(portfolio_id)?
            .ok_or_else(|| Error::not_found("Portfolio", portfolio_id))?;
        if portfolio.owner_id != user_id {
            debug!(
                "User {} denied access to portfolio {} owned by another user",
                user_id, portfolio_id
            );
            return Err(Error::Forbidden(format!(
                "portfolio {} belongs to another user",
                portfolio_id
            )));
        }
        Ok(portfolio)
    }

    /// Authorizes, then takes the portfolio's write lock and re-reads the
    /// portfolio under it so callers see the latest cost-basis method.
    pub async fn authorize_for_write(
        &self,
        user_id: &str,
        portfolio_id: &str,
    ) -> Result<(Portfolio, OwnedMutexGuard<()>)> {
        self.authorize(user_id, portfolio_id)?;
        let guard = self.locks.acquire(portfolio_id).await;
        let portfolio = self.authorize(user_id, portfolio_id)?;
        Ok((portfolio, guard))
    }

    /// Lock acquisition for system callers (scheduled jobs) that act on any portfolio.
    pub async fn lock(&self, portfolio_id: &str) -> OwnedMutexGuard<()> {
        self.locks.acquire(portfolio_id).await
    }

    pub fn locks(&self) -> &PortfolioLocks {
        &self.locks
    }

    pub fn repository(&self) -> &Arc<dyn PortfolioRepositoryTrait> {
        &self.repository
    }
}
