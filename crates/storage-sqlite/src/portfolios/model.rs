//! Database models for portfolios.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use folioledger_core::portfolios::{CostBasisMethod, Portfolio};

use crate::errors::StorageError;

/// Database model for portfolios
#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::portfolios)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct PortfolioDB {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub base_currency: String,
    pub cost_basis_method: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<PortfolioDB> for Portfolio {
    type Error = StorageError;

    fn try_from(db: PortfolioDB) -> Result<Self, Self::Error> {
        let cost_basis_method = CostBasisMethod::from_str(&db.cost_basis_method)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        Ok(Self {
            id: db.id,
            owner_id: db.owner_id,
            name: db.name,
            base_currency: db.base_currency,
            cost_basis_method,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}

impl From<Portfolio> for PortfolioDB {
    fn from(domain: Portfolio) -> Self {
        Self {
            id: domain.id,
            owner_id: domain.owner_id,
            name: domain.name,
            base_currency: domain.base_currency,
            cost_basis_method: domain.cost_basis_method.as_str().to_string(),
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        }
    }
}
