//! Database models for corporate actions and portfolio proposals.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use folioledger_core::corporate_actions::{
    CorporateAction, CorporateActionKind, CorporateActionParts, PortfolioAction, ProposalStatus,
};

use crate::errors::StorageError;
use crate::utils::{format_date, parse_date, parse_decimal, parse_optional_decimal};

/// Database model for catalogue entries. The action payload is flattened into
/// nullable columns; `dedupe_key` carries the uniqueness constraint.
#[derive(
    Queryable, Identifiable, Insertable, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(table_name = crate::schema::corporate_actions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct CorporateActionDB {
    pub id: String,
    pub symbol: String,
    pub action_type: String,
    pub ex_date: String,
    pub ratio: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub new_symbol: Option<String>,
    pub basis_fraction: Option<String>,
    pub dedupe_key: String,
    pub applied: bool,
    pub created_at: NaiveDateTime,
}

impl TryFrom<CorporateActionDB> for CorporateAction {
    type Error = StorageError;

    fn try_from(db: CorporateActionDB) -> Result<Self, Self::Error> {
        let parts = CorporateActionParts {
            action_type: db.action_type,
            ratio: parse_optional_decimal("ratio", db.ratio.as_deref())?,
            amount: parse_optional_decimal("amount", db.amount.as_deref())?,
            currency: db.currency,
            new_symbol: db.new_symbol,
            basis_fraction: parse_optional_decimal("basis_fraction", db.basis_fraction.as_deref())?,
        };
        let kind = CorporateActionKind::from_parts(parts)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        Ok(Self {
            ex_date: parse_date("ex_date", &db.ex_date)?,
            id: db.id,
            symbol: db.symbol,
            kind,
            applied: db.applied,
            created_at: db.created_at,
        })
    }
}

impl From<CorporateAction> for CorporateActionDB {
    fn from(domain: CorporateAction) -> Self {
        let dedupe_key = domain.dedupe_key();
        let parts = domain.kind.to_parts();
        Self {
            id: domain.id,
            symbol: domain.symbol,
            action_type: parts.action_type,
            ex_date: format_date(domain.ex_date),
            ratio: parts.ratio.map(|v| v.to_string()),
            amount: parts.amount.map(|v| v.to_string()),
            currency: parts.currency,
            new_symbol: parts.new_symbol,
            basis_fraction: parts.basis_fraction.map(|v| v.to_string()),
            dedupe_key,
            applied: domain.applied,
            created_at: domain.created_at,
        }
    }
}

/// Database model for per-portfolio proposals
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
#[diesel(table_name = crate::schema::portfolio_actions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioActionDB {
    pub id: String,
    pub portfolio_id: String,
    pub corporate_action_id: String,
    pub status: String,
    pub affected_symbol: String,
    pub shares_affected: String,
    pub description: String,
    pub detected_at: NaiveDateTime,
    pub reviewed_at: Option<NaiveDateTime>,
    pub applied_at: Option<NaiveDateTime>,
}

impl TryFrom<PortfolioActionDB> for PortfolioAction {
    type Error = StorageError;

    fn try_from(db: PortfolioActionDB) -> Result<Self, Self::Error> {
        let status = ProposalStatus::from_str(&db.status)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        Ok(Self {
            shares_affected: parse_decimal("shares_affected", &db.shares_affected)?,
            status,
            id: db.id,
            portfolio_id: db.portfolio_id,
            corporate_action_id: db.corporate_action_id,
            affected_symbol: db.affected_symbol,
            description: db.description,
            detected_at: db.detected_at,
            reviewed_at: db.reviewed_at,
            applied_at: db.applied_at,
        })
    }
}

impl From<PortfolioAction> for PortfolioActionDB {
    fn from(domain: PortfolioAction) -> Self {
        Self {
            id: domain.id,
            portfolio_id: domain.portfolio_id,
            corporate_action_id: domain.corporate_action_id,
            status: domain.status.as_str().to_string(),
            affected_symbol: domain.affected_symbol,
            shares_affected: domain.shares_affected.to_string(),
            description: domain.description,
            detected_at: domain.detected_at,
            reviewed_at: domain.reviewed_at,
            applied_at: domain.applied_at,
        }
    }
}
