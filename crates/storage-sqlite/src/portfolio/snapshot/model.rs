//! Database model for performance snapshots.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use folioledger_core::portfolio::snapshot::PerformanceSnapshot;

use crate::errors::StorageError;
use crate::utils::{format_date, parse_date, parse_decimal};

/// Database model for performance snapshots
#[derive(
    Queryable, Identifiable, Insertable, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(table_name = crate::schema::performance_snapshots)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSnapshotDB {
    pub id: String,
    pub portfolio_id: String,
    pub snapshot_date: String,
    pub total_value: String,
    pub total_cost_basis: String,
    pub total_return: String,
    pub total_return_pct: String,
    pub day_change: String,
    pub day_change_pct: String,
    pub created_at: NaiveDateTime,
}

impl TryFrom<PerformanceSnapshotDB> for PerformanceSnapshot {
    type Error = StorageError;

    fn try_from(db: PerformanceSnapshotDB) -> Result<Self, Self::Error> {
        Ok(Self {
            snapshot_date: parse_date("snapshot_date", &db.snapshot_date)?,
            total_value: parse_decimal("total_value", &db.total_value)?,
            total_cost_basis: parse_decimal("total_cost_basis", &db.total_cost_basis)?,
            total_return: parse_decimal("total_return", &db.total_return)?,
            total_return_pct: parse_decimal("total_return_pct", &db.total_return_pct)?,
            day_change: parse_decimal("day_change", &db.day_change)?,
            day_change_pct: parse_decimal("day_change_pct", &db.day_change_pct)?,
            id: db.id,
            portfolio_id: db.portfolio_id,
            created_at: db.created_at,
        })
    }
}

impl From<PerformanceSnapshot> for PerformanceSnapshotDB {
    fn from(domain: PerformanceSnapshot) -> Self {
        Self {
            id: domain.id,
            portfolio_id: domain.portfolio_id,
            snapshot_date: format_date(domain.snapshot_date),
            total_value: domain.total_value.to_string(),
            total_cost_basis: domain.total_cost_basis.to_string(),
            total_return: domain.total_return.to_string(),
            total_return_pct: domain.total_return_pct.to_string(),
            day_change: domain.day_change.to_string(),
            day_change_pct: domain.day_change_pct.to_string(),
            created_at: domain.created_at,
        }
    }
}
