//! Database models for holdings, tax lots and realized gains.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use folioledger_core::portfolio::holdings::Holding;
use folioledger_core::portfolio::tax_lots::{RealizedGain, TaxLot};

use crate::errors::StorageError;
use crate::utils::{format_date, parse_date, parse_decimal};

/// Database model for holdings
#[derive(Queryable, Insertable, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::holdings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct HoldingDB {
    pub portfolio_id: String,
    pub symbol: String,
    pub quantity: String,
    pub cost_basis: String,
    pub average_cost: String,
    pub currency: String,
    pub inception_date: String,
}

impl TryFrom<HoldingDB> for Holding {
    type Error = StorageError;

    fn try_from(db: HoldingDB) -> Result<Self, Self::Error> {
        Ok(Self {
            quantity: parse_decimal("quantity", &db.quantity)?,
            cost_basis: parse_decimal("cost_basis", &db.cost_basis)?,
            average_cost: parse_decimal("average_cost", &db.average_cost)?,
            inception_date: parse_date("inception_date", &db.inception_date)?,
            portfolio_id: db.portfolio_id,
            symbol: db.symbol,
            currency: db.currency,
        })
    }
}

impl From<Holding> for HoldingDB {
    fn from(domain: Holding) -> Self {
        Self {
            portfolio_id: domain.portfolio_id,
            symbol: domain.symbol,
            quantity: domain.quantity.to_string(),
            cost_basis: domain.cost_basis.to_string(),
            average_cost: domain.average_cost.to_string(),
            currency: domain.currency,
            inception_date: format_date(domain.inception_date),
        }
    }
}

/// Database model for tax lots
#[derive(
    Queryable, Identifiable, Insertable, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(table_name = crate::schema::tax_lots)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct TaxLotDB {
    pub id: String,
    pub portfolio_id: String,
    pub symbol: String,
    pub acquisition_date: String,
    pub original_quantity: String,
    pub remaining_quantity: String,
    pub cost_basis: String,
    pub cost_per_share: String,
    pub currency: String,
    pub transaction_id: String,
}

impl TryFrom<TaxLotDB> for TaxLot {
    type Error = StorageError;

    fn try_from(db: TaxLotDB) -> Result<Self, Self::Error> {
        Ok(Self {
            acquisition_date: parse_date("acquisition_date", &db.acquisition_date)?,
            original_quantity: parse_decimal("original_quantity", &db.original_quantity)?,
            remaining_quantity: parse_decimal("remaining_quantity", &db.remaining_quantity)?,
            cost_basis: parse_decimal("cost_basis", &db.cost_basis)?,
            cost_per_share: parse_decimal("cost_per_share", &db.cost_per_share)?,
            id: db.id,
            portfolio_id: db.portfolio_id,
            symbol: db.symbol,
            currency: db.currency,
            transaction_id: db.transaction_id,
        })
    }
}

impl From<TaxLot> for TaxLotDB {
    fn from(domain: TaxLot) -> Self {
        Self {
            id: domain.id,
            portfolio_id: domain.portfolio_id,
            symbol: domain.symbol,
            acquisition_date: format_date(domain.acquisition_date),
            original_quantity: domain.original_quantity.to_string(),
            remaining_quantity: domain.remaining_quantity.to_string(),
            cost_basis: domain.cost_basis.to_string(),
            cost_per_share: domain.cost_per_share.to_string(),
            currency: domain.currency,
            transaction_id: domain.transaction_id,
        }
    }
}

/// Database model for realized gains.
///
/// `position` keeps the replay order, which disposal date alone does not.
#[derive(
    Queryable, Identifiable, Insertable, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(table_name = crate::schema::realized_gains)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct RealizedGainDB {
    pub id: String,
    pub portfolio_id: String,
    pub symbol: String,
    pub lot_id: String,
    pub transaction_id: String,
    pub acquisition_date: String,
    pub disposal_date: String,
    pub quantity: String,
    pub cost_basis: String,
    pub proceeds: String,
    pub gain: String,
    pub long_term: bool,
    pub currency: String,
    pub position: i32,
}

impl RealizedGainDB {
    pub fn from_domain(domain: RealizedGain, position: i32) -> Self {
        Self {
            id: domain.id,
            portfolio_id: domain.portfolio_id,
            symbol: domain.symbol,
            lot_id: domain.lot_id,
            transaction_id: domain.transaction_id,
            acquisition_date: format_date(domain.acquisition_date),
            disposal_date: format_date(domain.disposal_date),
            quantity: domain.quantity.to_string(),
            cost_basis: domain.cost_basis.to_string(),
            proceeds: domain.proceeds.to_string(),
            gain: domain.gain.to_string(),
            long_term: domain.long_term,
            currency: domain.currency,
            position,
        }
    }
}

impl TryFrom<RealizedGainDB> for RealizedGain {
    type Error = StorageError;

    fn try_from(db: RealizedGainDB) -> Result<Self, Self::Error> {
        Ok(Self {
            acquisition_date: parse_date("acquisition_date", &db.acquisition_date)?,
            disposal_date: parse_date("disposal_date", &db.disposal_date)?,
            quantity: parse_decimal("quantity", &db.quantity)?,
            cost_basis: parse_decimal("cost_basis", &db.cost_basis)?,
            proceeds: parse_decimal("proceeds", &db.proceeds)?,
            gain: parse_decimal("gain", &db.gain)?,
            id: db.id,
            portfolio_id: db.portfolio_id,
            symbol: db.symbol,
            lot_id: db.lot_id,
            transaction_id: db.transaction_id,
            long_term: db.long_term,
            currency: db.currency,
        })
    }
}
