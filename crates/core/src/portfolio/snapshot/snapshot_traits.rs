use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use super::snapshot_model::PerformanceSnapshot;
use crate::errors::Result;

/// Persistence for daily performance snapshots.
#[async_trait]
pub trait SnapshotRepositoryTrait: Send + Sync {
    /// Fails with CONFLICT when a snapshot already exists for the (portfolio, date).
    async fn insert(&self, snapshot: PerformanceSnapshot) -> Result<PerformanceSnapshot>;
    fn get(&self, portfolio_id: &str, date: NaiveDate) -> Result<Option<PerformanceSnapshot>>;
    /// Snapshots ordered by date.
    fn list(&self, portfolio_id: &str) -> Result<Vec<PerformanceSnapshot>>;
    fn list_range(
        &self,
        portfolio_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PerformanceSnapshot>>;
    fn latest(&self, portfolio_id: &str) -> Result<Option<PerformanceSnapshot>>;
    /// Deletes snapshots dated strictly before `cutoff` across all portfolios.
    async fn delete_older_than(&self, cutoff: NaiveDate) -> Result<usize>;
}

#[async_trait]
pub trait SnapshotServiceTrait: Send + Sync {
    /// Writes the portfolio's snapshot for `date`, or returns the existing one.
    async fn generate_for_date(
        &self,
        portfolio_id: &str,
        date: NaiveDate,
    ) -> Result<PerformanceSnapshot>;

    /// Snapshots every portfolio for `date`. Returns how many were written or already present.
    async fn generate_all(&self, date: NaiveDate, cancel: &CancellationToken) -> Result<usize>;

    fn list(&self, user_id: &str, portfolio_id: &str) -> Result<Vec<PerformanceSnapshot>>;

    fn list_range(
        &self,
        user_id: &str,
        portfolio_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PerformanceSnapshot>>;

    fn latest(&self, user_id: &str, portfolio_id: &str) -> Result<Option<PerformanceSnapshot>>;

    async fn prune_older_than(&self, cutoff: NaiveDate) -> Result<usize>;
}
