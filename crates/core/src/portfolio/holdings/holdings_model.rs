use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Derived position of one symbol in one portfolio.
///
/// Quantity and cost basis are aggregated from the symbol's open tax lots, so
/// `cost_basis == Σ cost_per_share · remaining_quantity` always holds. A holding
/// with zero quantity is never materialized.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub portfolio_id: String,
    pub symbol: String,
    pub quantity: Decimal,
    pub cost_basis: Decimal,
    /// Average cost per share, `cost_basis / quantity`.
    pub average_cost: Decimal,
    pub currency: String,
    /// Earliest acquisition date among the open lots.
    pub inception_date: NaiveDate,
}

/// Holding enriched with market fields for display.
///
/// Market fields are `None` when no quote could be obtained.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HoldingView {
    #[serde(flatten)]
    pub holding: Holding,
    pub market_price: Option<Decimal>,
    pub market_value: Option<Decimal>,
    pub unrealized_gain: Option<Decimal>,
    pub unrealized_gain_pct: Option<Decimal>,
    pub day_change: Option<Decimal>,
    pub day_change_pct: Option<Decimal>,
    pub price_date: Option<NaiveDate>,
}

impl From<Holding> for HoldingView {
    fn from(holding: Holding) -> Self {
        HoldingView {
            holding,
            market_price: None,
            market_value: None,
            unrealized_gain: None,
            unrealized_gain_pct: None,
            day_change: None,
            day_change_pct: None,
            price_date: None,
        }
    }
}
