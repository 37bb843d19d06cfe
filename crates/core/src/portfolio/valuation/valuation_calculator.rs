use chrono::NaiveDate;

use super::price_book::PriceBook;
use super::valuation_model::{PortfolioValuation, PositionValuation, PriceSource};
use crate::portfolio::projection::Projection;
use crate::utils::decimal_utils::round_intermediate;

/// Values the holdings of `projection` at the end of `date`.
///
/// A position without a close on or shortly before `date` is carried at its
/// cost basis.
pub fn calculate_valuation(
    portfolio_id: &str,
    projection: &Projection,
    date: NaiveDate,
    prices: &PriceBook,
) -> PortfolioValuation {
    let positions: Vec<PositionValuation> = projection
        .holdings
        .iter()
        .map(|holding| match prices.price_on(&holding.symbol, date) {
            Some((price_date, close)) => PositionValuation {
                symbol: holding.symbol.clone(),
                quantity: holding.quantity,
                price: Some(close),
                cost_basis: holding.cost_basis,
                market_value: round_intermediate(holding.quantity * close),
                price_source: if price_date == date {
                    PriceSource::Close
                } else {
                    PriceSource::Fallback { date: price_date }
                },
            },
            None => PositionValuation {
                symbol: holding.symbol.clone(),
                quantity: holding.quantity,
                price: None,
                cost_basis: holding.cost_basis,
                market_value: holding.cost_basis,
                price_source: PriceSource::CostBasis,
            },
        })
        .collect();

    PortfolioValuation {
        portfolio_id: portfolio_id.to_string(),
        valuation_date: date,
        total_value: positions.iter().map(|p| p.market_value).sum(),
        cost_basis: positions.iter().map(|p| p.cost_basis).sum(),
        positions,
    }
}
