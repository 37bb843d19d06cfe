use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use log::{debug, error, info};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::snapshot_model::PerformanceSnapshot;
use super::snapshot_traits::{SnapshotRepositoryTrait, SnapshotServiceTrait};
use crate::errors::{Error, ErrorKind, Result, ValidationError};
use crate::portfolio::valuation::ValuationService;
use crate::portfolios::PortfolioAccess;
use crate::transactions::TransactionRepositoryTrait;

pub struct SnapshotService {
    access: PortfolioAccess,
    repository: Arc<dyn SnapshotRepositoryTrait>,
    transactions: Arc<dyn TransactionRepositoryTrait>,
    valuation: ValuationService,
}

impl SnapshotService {
    pub fn new(
        access: PortfolioAccess,
        repository: Arc<dyn SnapshotRepositoryTrait>,
        transactions: Arc<dyn TransactionRepositoryTrait>,
        valuation: ValuationService,
    ) -> Self {
        Self {
            access,
            repository,
            transactions,
            valuation,
        }
    }
}

#[async_trait]
impl SnapshotServiceTrait for SnapshotService {
    async fn generate_for_date(
        &self,
        portfolio_id: &str,
        date: NaiveDate,
    ) -> Result<PerformanceSnapshot> {
        if let Some(existing) = self.repository.get(portfolio_id, date)? {
            return Ok(existing);
        }
        let portfolio = self
            .access
            .repository()
            .get_by_id(portfolio_id)?
            .ok_or_else(|| Error::not_found("Portfolio", portfolio_id))?;
        let ledger = self.transactions.list_by_portfolio(portfolio_id)?;

        let previous_date = date - Duration::days(1);
        let previous_value = match self.repository.get(portfolio_id, previous_date)? {
            Some(previous) => previous.total_value,
            None => {
                self.valuation
                    .value_on(&portfolio, &ledger, previous_date)
                    .await?
                    .total_value
            }
        };
        let valuation = self.valuation.value_on(&portfolio, &ledger, date).await?;
        let snapshot =
            PerformanceSnapshot::from_valuation(&valuation, previous_value, Utc::now().naive_utc());

        match self.repository.insert(snapshot).await {
            Ok(inserted) => {
                debug!("Snapshot for portfolio {} on {} written", portfolio_id, date);
                Ok(inserted)
            }
            // Another writer got there first; snapshots are immutable, keep theirs.
            Err(e) if e.kind() == ErrorKind::Conflict => self
                .repository
                .get(portfolio_id, date)?
                .ok_or(e),
            Err(e) => Err(e),
        }
    }

    async fn generate_all(&self, date: NaiveDate, cancel: &CancellationToken) -> Result<usize> {
        let portfolios = self.access.repository().list_all()?;
        let mut written = 0;
        for portfolio in portfolios {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled(format!(
                    "snapshot generation stopped after {} portfolios",
                    written
                )));
            }
            match self.generate_for_date(&portfolio.id, date).await {
                Ok(_) => written += 1,
                Err(e) => error!(
                    "Snapshot for portfolio {} on {} failed: {}",
                    portfolio.id, date, e
                ),
            }
        }
        info!("Generated {} snapshots for {}", written, date);
        Ok(written)
    }

    fn list(&self, user_id: &str, portfolio_id: &str) -> Result<Vec<PerformanceSnapshot>> {
        self.access.authorize(user_id, portfolio_id)?;
        self.repository.list(portfolio_id)
    }

    fn list_range(
        &self,
        user_id: &str,
        portfolio_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PerformanceSnapshot>> {
        self.access.authorize(user_id, portfolio_id)?;
        if start > end {
            return Err(Error::Validation(ValidationError::field(
                "startDate",
                "start date must not be after end date",
            )));
        }
        self.repository.list_range(portfolio_id, start, end)
    }

    fn latest(&self, user_id: &str, portfolio_id: &str) -> Result<Option<PerformanceSnapshot>> {
        self.access.authorize(user_id, portfolio_id)?;
        self.repository.latest(portfolio_id)
    }

    async fn prune_older_than(&self, cutoff: NaiveDate) -> Result<usize> {
        let removed = self.repository.delete_older_than(cutoff).await?;
        info!("Pruned {} snapshots older than {}", removed, cutoff);
        Ok(removed)
    }
}
