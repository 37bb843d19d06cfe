use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result, ValidationError};
use crate::portfolios::CostBasisMethod;
use crate::utils::decimal_utils::{is_quantity_significant, round_intermediate};

/// One acquisition event's shares, the unit of basis accounting for disposals.
///
/// `remaining_quantity` stays within `[0, original_quantity]`; a lot with nothing
/// remaining is closed but kept for tax history.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaxLot {
    pub id: String,
    pub portfolio_id: String,
    pub symbol: String,
    pub acquisition_date: NaiveDate,
    pub original_quantity: Decimal,
    pub remaining_quantity: Decimal,
    /// Basis of the original quantity, commissions included.
    pub cost_basis: Decimal,
    pub cost_per_share: Decimal,
    pub currency: String,
    /// Ledger entry that opened (or last transformed) the lot.
    pub transaction_id: String,
}

impl TaxLot {
    pub fn is_open(&self) -> bool {
        self.remaining_quantity > Decimal::ZERO && is_quantity_significant(&self.remaining_quantity)
    }

    /// Basis attributable to the shares still held.
    pub fn remaining_cost_basis(&self) -> Decimal {
        round_intermediate(self.cost_per_share * self.remaining_quantity)
    }
}

/// Gain or loss produced by consuming (part of) one lot in a disposal.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RealizedGain {
    pub id: String,
    pub portfolio_id: String,
    pub symbol: String,
    pub lot_id: String,
    /// The SELL that consumed the lot.
    pub transaction_id: String,
    pub acquisition_date: NaiveDate,
    pub disposal_date: NaiveDate,
    pub quantity: Decimal,
    pub cost_basis: Decimal,
    /// Sale value net of the apportioned commission.
    pub proceeds: Decimal,
    pub gain: Decimal,
    pub long_term: bool,
    pub currency: String,
}

/// Caller-chosen lot and quantity for a specific-lot disposal.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LotSelection {
    pub lot_id: String,
    pub quantity: Decimal,
}

/// A sale the caller wants to record or preview.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    pub symbol: String,
    pub quantity: Decimal,
    pub price: Decimal,
    #[serde(default)]
    pub commission: Decimal,
    pub trade_date: NaiveDate,
    pub currency: Option<String>,
    pub method: CostBasisMethod,
    #[serde(default)]
    pub selections: Vec<LotSelection>,
    pub notes: Option<String>,
}

/// Result of running the allocator without writing anything.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaleAllocation {
    pub symbol: String,
    pub method: CostBasisMethod,
    pub selections: Vec<LotSelection>,
    pub realized_gains: Vec<RealizedGain>,
    pub total_cost_basis: Decimal,
    pub total_proceeds: Decimal,
    pub total_gain: Decimal,
}

/// An open lot currently worth less than its basis.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HarvestOpportunity {
    pub lot_id: String,
    pub symbol: String,
    pub acquisition_date: NaiveDate,
    pub quantity: Decimal,
    pub cost_basis: Decimal,
    pub current_price: Decimal,
    pub current_value: Decimal,
    /// Negative amount: `current_value - cost_basis`.
    pub unrealized_loss: Decimal,
    /// Loss magnitude as a percentage of basis.
    pub loss_pct: Decimal,
    pub long_term: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TaxBucket {
    pub count: usize,
    pub quantity: Decimal,
    pub proceeds: Decimal,
    pub cost_basis: Decimal,
    pub gain: Decimal,
    pub gains: Vec<RealizedGain>,
}

impl TaxBucket {
    pub fn add(&mut self, gain: RealizedGain) {
        self.count += 1;
        self.quantity += gain.quantity;
        self.proceeds += gain.proceeds;
        self.cost_basis += gain.cost_basis;
        self.gain += gain.gain;
        self.gains.push(gain);
    }
}

/// Realized gains of one calendar year split into short- and long-term buckets.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaxReport {
    pub portfolio_id: String,
    pub year: i32,
    pub short_term: TaxBucket,
    pub long_term: TaxBucket,
    pub total_proceeds: Decimal,
    pub total_cost_basis: Decimal,
    pub total_gain: Decimal,
}

impl SaleRequest {
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(invalid("symbol", "symbol is required"));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(invalid("quantity", "quantity must be greater than zero"));
        }
        if self.price < Decimal::ZERO {
            return Err(invalid("price", "price cannot be negative"));
        }
        if self.commission < Decimal::ZERO {
            return Err(invalid("commission", "commission cannot be negative"));
        }
        match self.method {
            CostBasisMethod::SpecificLot if self.selections.is_empty() => Err(invalid(
                "selections",
                "a specific-lot sale needs at least one lot selection",
            )),
            CostBasisMethod::Fifo | CostBasisMethod::Lifo if !self.selections.is_empty() => Err(
                invalid("selections", "lot selections require the SPECIFIC_LOT method"),
            ),
            _ => Ok(()),
        }
    }
}

fn invalid(field: &str, message: &str) -> Error {
    Error::Validation(ValidationError::field(field, message))
}
