use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use log::debug;
use std::sync::Arc;

use folioledger_core::portfolio::snapshot::{PerformanceSnapshot, SnapshotRepositoryTrait};
use folioledger_core::Result;

use super::model::PerformanceSnapshotDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::performance_snapshots::dsl::*;
use crate::utils::format_date;

/// Snapshots are write-once: there is no update path, and a second insert for
/// the same (portfolio, date) fails on the unique index.
pub struct SnapshotRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl SnapshotRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        SnapshotRepository { pool, writer }
    }

    fn to_domain(rows: Vec<PerformanceSnapshotDB>) -> Result<Vec<PerformanceSnapshot>> {
        rows.into_iter()
            .map(|row| PerformanceSnapshot::try_from(row).into_core())
            .collect()
    }
}

#[async_trait]
impl SnapshotRepositoryTrait for SnapshotRepository {
    async fn insert(&self, snapshot: PerformanceSnapshot) -> Result<PerformanceSnapshot> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<PerformanceSnapshot> {
                let inserted = diesel::insert_into(performance_snapshots)
                    .values(PerformanceSnapshotDB::from(snapshot))
                    .returning(PerformanceSnapshotDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok(PerformanceSnapshot::try_from(inserted)?)
            })
            .await
    }

    fn get(&self, pid: &str, date: NaiveDate) -> Result<Option<PerformanceSnapshot>> {
        let mut conn = get_connection(&self.pool)?;
        performance_snapshots
            .filter(portfolio_id.eq(pid))
            .filter(snapshot_date.eq(format_date(date)))
            .select(PerformanceSnapshotDB::as_select())
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .map(|row| PerformanceSnapshot::try_from(row).into_core())
            .transpose()
    }

    fn list(&self, pid: &str) -> Result<Vec<PerformanceSnapshot>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = performance_snapshots
            .filter(portfolio_id.eq(pid))
            .order(snapshot_date.asc())
            .select(PerformanceSnapshotDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?;
        Self::to_domain(rows)
    }

    fn list_range(
        &self,
        pid: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PerformanceSnapshot>> {
        let mut conn = get_connection(&self.pool)?;
        // ISO dates compare correctly as text.
        let rows = performance_snapshots
            .filter(portfolio_id.eq(pid))
            .filter(snapshot_date.ge(format_date(start)))
            .filter(snapshot_date.le(format_date(end)))
            .order(snapshot_date.asc())
            .select(PerformanceSnapshotDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?;
        Self::to_domain(rows)
    }

    fn latest(&self, pid: &str) -> Result<Option<PerformanceSnapshot>> {
        let mut conn = get_connection(&self.pool)?;
        performance_snapshots
            .filter(portfolio_id.eq(pid))
            .order(snapshot_date.desc())
            .select(PerformanceSnapshotDB::as_select())
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .map(|row| PerformanceSnapshot::try_from(row).into_core())
            .transpose()
    }

    async fn delete_older_than(&self, cutoff: NaiveDate) -> Result<usize> {
        let cutoff_str = format_date(cutoff);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let removed = diesel::delete(performance_snapshots.filter(snapshot_date.lt(&cutoff_str)))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                debug!("Pruned {} snapshots dated before {}", removed, cutoff_str);
                Ok(removed)
            })
            .await
    }
}
