//! Disposal allocation across open tax lots.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::tax_lots_model::{LotSelection, TaxLot};
use crate::errors::AccountingError;
use crate::portfolios::CostBasisMethod;

/// Quantity taken from one lot by a disposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotConsumption {
    pub lot_id: String,
    pub quantity: Decimal,
}

/// How a disposal picks its lots.
#[derive(Debug, Clone, Copy)]
pub enum AllocationStrategy<'a> {
    Fifo,
    Lifo,
    Specific(&'a [LotSelection]),
}

impl<'a> AllocationStrategy<'a> {
    /// Explicit selections win; a SPECIFIC_LOT disposal without selections falls back to FIFO.
    pub fn resolve(method: CostBasisMethod, selections: &'a [LotSelection]) -> Self {
        if !selections.is_empty() {
            return AllocationStrategy::Specific(selections);
        }
        match method {
            CostBasisMethod::Lifo => AllocationStrategy::Lifo,
            CostBasisMethod::Fifo | CostBasisMethod::SpecificLot => AllocationStrategy::Fifo,
        }
    }
}

/// Decides which lots of `symbol` a disposal of `quantity` consumes.
///
/// `lots` may contain lots of other symbols and closed lots; only open lots of
/// `symbol` are candidates. Nothing is mutated.
pub fn allocate(
    strategy: AllocationStrategy<'_>,
    symbol: &str,
    lots: &[TaxLot],
    quantity: Decimal,
) -> Result<Vec<LotConsumption>, AccountingError> {
    if quantity <= Decimal::ZERO {
        return Err(AccountingError::InvalidAllocation(
            "disposal quantity must be greater than zero".to_string(),
        ));
    }

    let mut candidates: Vec<&TaxLot> = lots
        .iter()
        .filter(|lot| lot.symbol == symbol && lot.is_open())
        .collect();

    match strategy {
        AllocationStrategy::Specific(selections) => {
            allocate_specific(symbol, &candidates, lots, quantity, selections)
        }
        AllocationStrategy::Fifo | AllocationStrategy::Lifo => {
            let available: Decimal = candidates.iter().map(|lot| lot.remaining_quantity).sum();
            if available < quantity {
                return Err(AccountingError::InsufficientLots {
                    symbol: symbol.to_string(),
                    requested: quantity,
                    available,
                });
            }

            // Stable sort keeps creation order between lots acquired on the same day.
            candidates.sort_by(|a, b| a.acquisition_date.cmp(&b.acquisition_date));
            if matches!(strategy, AllocationStrategy::Lifo) {
                candidates.reverse();
            }

            let mut outstanding = quantity;
            let mut consumed = Vec::new();
            for lot in candidates {
                if outstanding <= Decimal::ZERO {
                    break;
                }
                let take = lot.remaining_quantity.min(outstanding);
                outstanding -= take;
                consumed.push(LotConsumption {
                    lot_id: lot.id.clone(),
                    quantity: take,
                });
            }
            Ok(consumed)
        }
    }
}

fn allocate_specific(
    symbol: &str,
    candidates: &[&TaxLot],
    all_lots: &[TaxLot],
    quantity: Decimal,
    selections: &[LotSelection],
) -> Result<Vec<LotConsumption>, AccountingError> {
    let selected: Decimal = selections.iter().map(|s| s.quantity).sum();
    if selected != quantity {
        return Err(AccountingError::InvalidAllocation(format!(
            "selected lots total {} but the disposal is {} shares of {}",
            selected, quantity, symbol
        )));
    }

    // Repeated lot ids are merged, keeping the caller's order of first mention.
    let mut merged: Vec<LotConsumption> = Vec::new();
    for selection in selections {
        if selection.quantity <= Decimal::ZERO {
            return Err(AccountingError::InvalidAllocation(format!(
                "selection for lot {} must be greater than zero",
                selection.lot_id
            )));
        }
        match merged.iter_mut().find(|c| c.lot_id == selection.lot_id) {
            Some(existing) => existing.quantity += selection.quantity,
            None => merged.push(LotConsumption {
                lot_id: selection.lot_id.clone(),
                quantity: selection.quantity,
            }),
        }
    }

    for consumption in &merged {
        let Some(lot) = candidates.iter().find(|lot| lot.id == consumption.lot_id) else {
            let reason = match all_lots.iter().find(|lot| lot.id == consumption.lot_id) {
                Some(lot) if lot.symbol != symbol => {
                    format!("lot {} belongs to {}, not {}", lot.id, lot.symbol, symbol)
                }
                Some(lot) => format!("lot {} is closed", lot.id),
                None => format!("lot {} does not exist", consumption.lot_id),
            };
            return Err(AccountingError::InvalidAllocation(reason));
        };
        if lot.remaining_quantity < consumption.quantity {
            return Err(AccountingError::InsufficientLots {
                symbol: symbol.to_string(),
                requested: consumption.quantity,
                available: lot.remaining_quantity,
            });
        }
    }
    Ok(merged)
}
