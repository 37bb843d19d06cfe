//! Portfolio valuation domain models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where a position's price on a valuation date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "kind")]
pub enum PriceSource {
    /// Close on the valuation date itself.
    Close,
    /// Most recent close within the fallback window.
    Fallback { date: NaiveDate },
    /// No usable close; valued at cost basis.
    CostBasis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionValuation {
    pub symbol: String,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub cost_basis: Decimal,
    pub market_value: Decimal,
    pub price_source: PriceSource,
}

/// Value of a portfolio's holdings at the end of one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioValuation {
    pub portfolio_id: String,
    pub valuation_date: NaiveDate,
    pub total_value: Decimal,
    pub cost_basis: Decimal,
    pub positions: Vec<PositionValuation>,
}
