use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::portfolio::valuation::PortfolioValuation;
use crate::utils::decimal_utils::{ratio_to_percent, round_intermediate, safe_div};

/// Immutable daily rollup of a portfolio's valuation. One per (portfolio, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSnapshot {
    pub id: String,
    pub portfolio_id: String,
    pub snapshot_date: NaiveDate,
    pub total_value: Decimal,
    pub total_cost_basis: Decimal,
    /// `total_value − total_cost_basis`.
    pub total_return: Decimal,
    pub total_return_pct: Decimal,
    pub day_change: Decimal,
    pub day_change_pct: Decimal,
    pub created_at: NaiveDateTime,
}

impl PerformanceSnapshot {
    /// Builds the row for `valuation`, measuring day change against the
    /// previous day's total value.
    pub fn from_valuation(
        valuation: &PortfolioValuation,
        previous_value: Decimal,
        created_at: NaiveDateTime,
    ) -> Self {
        let total_return = round_intermediate(valuation.total_value - valuation.cost_basis);
        let day_change = round_intermediate(valuation.total_value - previous_value);
        PerformanceSnapshot {
            id: format!("{}_{}", valuation.portfolio_id, valuation.valuation_date),
            portfolio_id: valuation.portfolio_id.clone(),
            snapshot_date: valuation.valuation_date,
            total_value: valuation.total_value,
            total_cost_basis: valuation.cost_basis,
            total_return,
            total_return_pct: ratio_to_percent(safe_div(total_return, valuation.cost_basis)),
            day_change,
            day_change_pct: ratio_to_percent(safe_div(day_change, previous_value)),
            created_at,
        }
    }
}
