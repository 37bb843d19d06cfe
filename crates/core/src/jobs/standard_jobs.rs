//! The recurring housekeeping jobs of a running server.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveTime, Utc};
use log::info;
use std::sync::Arc;
use std::time::Duration;

use folioledger_market_data::MarketDataAdapter;

use super::job_model::{JobContext, Schedule};
use super::job_traits::Job;
use crate::corporate_actions::CorporateActionServiceTrait;
use crate::errors::{Error, Result};
use crate::portfolio::holdings::HoldingRepositoryTrait;
use crate::portfolio::snapshot::SnapshotServiceTrait;
use crate::users::SessionTokenRepositoryTrait;

/// Scans the non-applied catalogue and raises proposals.
pub struct CorporateActionDetectionJob {
    service: Arc<dyn CorporateActionServiceTrait>,
    interval: Duration,
}

impl CorporateActionDetectionJob {
    pub fn new(service: Arc<dyn CorporateActionServiceTrait>, interval: Duration) -> Self {
        Self { service, interval }
    }
}

#[async_trait]
impl Job for CorporateActionDetectionJob {
    fn name(&self) -> &'static str {
        "corporate_action_detection"
    }

    fn schedule(&self) -> Schedule {
        Schedule::Every(self.interval)
    }

    async fn run(&self, ctx: &JobContext) -> Result<()> {
        let summary = self.service.detect_all(&ctx.cancel).await?;
        info!(
            "Detection scanned {} actions and raised {} proposals",
            summary.actions_scanned, summary.proposals_created
        );
        Ok(())
    }
}

/// Drops cached market data and warms the cache with every held symbol.
pub struct PriceRefreshJob {
    market_data: Arc<dyn MarketDataAdapter>,
    holdings: Arc<dyn HoldingRepositoryTrait>,
    run_after: NaiveTime,
}

impl PriceRefreshJob {
    pub fn new(
        market_data: Arc<dyn MarketDataAdapter>,
        holdings: Arc<dyn HoldingRepositoryTrait>,
        run_after: NaiveTime,
    ) -> Self {
        Self {
            market_data,
            holdings,
            run_after,
        }
    }
}

#[async_trait]
impl Job for PriceRefreshJob {
    fn name(&self) -> &'static str {
        "price_refresh"
    }

    fn schedule(&self) -> Schedule {
        Schedule::DailyAfter(self.run_after)
    }

    async fn run(&self, ctx: &JobContext) -> Result<()> {
        self.market_data.clear_cache();
        let symbols = self.holdings.list_held_symbols()?;
        if ctx.is_cancelled() {
            return Err(Error::Cancelled("price refresh".to_string()));
        }
        let quotes = self.market_data.get_quotes(&symbols).await;
        info!(
            "Price cache warmed with {} of {} held symbols",
            quotes.len(),
            symbols.len()
        );
        Ok(())
    }
}

/// Writes today's snapshot for every portfolio.
pub struct SnapshotJob {
    service: Arc<dyn SnapshotServiceTrait>,
    run_after: NaiveTime,
}

impl SnapshotJob {
    pub fn new(service: Arc<dyn SnapshotServiceTrait>, run_after: NaiveTime) -> Self {
        Self { service, run_after }
    }
}

#[async_trait]
impl Job for SnapshotJob {
    fn name(&self) -> &'static str {
        "snapshot_generation"
    }

    fn schedule(&self) -> Schedule {
        Schedule::DailyAfter(self.run_after)
    }

    async fn run(&self, ctx: &JobContext) -> Result<()> {
        let today = Utc::now().date_naive();
        self.service.generate_all(today, &ctx.cancel).await?;
        Ok(())
    }
}

/// Prunes old snapshots and spent session tokens.
pub struct CleanupJob {
    snapshots: Arc<dyn SnapshotServiceTrait>,
    tokens: Arc<dyn SessionTokenRepositoryTrait>,
    retention_days: i64,
    run_after: NaiveTime,
}

impl CleanupJob {
    pub fn new(
        snapshots: Arc<dyn SnapshotServiceTrait>,
        tokens: Arc<dyn SessionTokenRepositoryTrait>,
        retention_days: i64,
        run_after: NaiveTime,
    ) -> Self {
        Self {
            snapshots,
            tokens,
            retention_days,
            run_after,
        }
    }
}

#[async_trait]
impl Job for CleanupJob {
    fn name(&self) -> &'static str {
        "cleanup"
    }

    fn schedule(&self) -> Schedule {
        Schedule::DailyAfter(self.run_after)
    }

    async fn run(&self, ctx: &JobContext) -> Result<()> {
        let now = Utc::now().naive_utc();
        let cutoff = now.date() - ChronoDuration::days(self.retention_days);
        let snapshots = self.snapshots.prune_older_than(cutoff).await?;
        if ctx.is_cancelled() {
            return Err(Error::Cancelled("cleanup".to_string()));
        }
        let refresh = self.tokens.delete_expired_refresh_tokens(now).await?;
        let resets = self.tokens.delete_spent_password_reset_tokens(now).await?;
        info!(
            "Cleanup removed {} snapshots, {} refresh tokens, {} reset tokens",
            snapshots, refresh, resets
        );
        Ok(())
    }
}
