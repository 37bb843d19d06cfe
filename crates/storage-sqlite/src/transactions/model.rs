//! Database models for ledger entries and import batches.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use folioledger_core::portfolio::tax_lots::LotSelection;
use folioledger_core::transactions::{ImportBatch, Transaction, TransactionType};

use crate::errors::StorageError;
use crate::utils::{format_date, parse_date, parse_decimal, parse_optional_decimal};

/// Database model for ledger entries.
///
/// Quantities and prices are stored as decimal strings, dates as `YYYY-MM-DD`,
/// and lot selections as a JSON array.
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
#[diesel(table_name = crate::schema::transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDB {
    pub id: String,
    pub portfolio_id: String,
    pub transaction_type: String,
    pub symbol: String,
    pub trade_date: String,
    pub quantity: String,
    pub price: Option<String>,
    pub commission: String,
    pub currency: String,
    pub notes: Option<String>,
    pub import_batch_id: Option<String>,
    pub ratio: Option<String>,
    pub related_symbol: Option<String>,
    pub basis_fraction: Option<String>,
    pub lot_selections: String,
    pub corporate_action_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<TransactionDB> for Transaction {
    type Error = StorageError;

    fn try_from(db: TransactionDB) -> Result<Self, Self::Error> {
        let transaction_type = TransactionType::from_str(&db.transaction_type)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        let lot_selections: Vec<LotSelection> = serde_json::from_str(&db.lot_selections)?;
        Ok(Self {
            transaction_type,
            trade_date: parse_date("trade_date", &db.trade_date)?,
            quantity: parse_decimal("quantity", &db.quantity)?,
            price: parse_optional_decimal("price", db.price.as_deref())?,
            commission: parse_decimal("commission", &db.commission)?,
            ratio: parse_optional_decimal("ratio", db.ratio.as_deref())?,
            basis_fraction: parse_optional_decimal("basis_fraction", db.basis_fraction.as_deref())?,
            lot_selections,
            id: db.id,
            portfolio_id: db.portfolio_id,
            symbol: db.symbol,
            currency: db.currency,
            notes: db.notes,
            import_batch_id: db.import_batch_id,
            related_symbol: db.related_symbol,
            corporate_action_id: db.corporate_action_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}

impl TryFrom<Transaction> for TransactionDB {
    type Error = StorageError;

    fn try_from(domain: Transaction) -> Result<Self, Self::Error> {
        Ok(Self {
            lot_selections: serde_json::to_string(&domain.lot_selections)?,
            id: domain.id,
            portfolio_id: domain.portfolio_id,
            transaction_type: domain.transaction_type.as_str().to_string(),
            symbol: domain.symbol,
            trade_date: format_date(domain.trade_date),
            quantity: domain.quantity.to_string(),
            price: domain.price.map(|v| v.to_string()),
            commission: domain.commission.to_string(),
            currency: domain.currency,
            notes: domain.notes,
            import_batch_id: domain.import_batch_id,
            ratio: domain.ratio.map(|v| v.to_string()),
            related_symbol: domain.related_symbol,
            basis_fraction: domain.basis_fraction.map(|v| v.to_string()),
            corporate_action_id: domain.corporate_action_id,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        })
    }
}

/// Database model for import batches
#[derive(
    Queryable, Identifiable, Insertable, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(table_name = crate::schema::import_batches)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct ImportBatchDB {
    pub id: String,
    pub portfolio_id: String,
    pub format_tag: String,
    pub imported_at: NaiveDateTime,
    pub notes: Option<String>,
}

impl From<ImportBatchDB> for ImportBatch {
    fn from(db: ImportBatchDB) -> Self {
        Self {
            id: db.id,
            portfolio_id: db.portfolio_id,
            format_tag: db.format_tag,
            imported_at: db.imported_at,
            notes: db.notes,
        }
    }
}

impl From<ImportBatch> for ImportBatchDB {
    fn from(domain: ImportBatch) -> Self {
        Self {
            id: domain.id,
            portfolio_id: domain.portfolio_id,
            format_tag: domain.format_tag,
            imported_at: domain.imported_at,
            notes: domain.notes,
        }
    }
}
