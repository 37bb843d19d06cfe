use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeSet;
use std::sync::Arc;

use folioledger_market_data::MarketDataAdapter;

use super::price_book::PriceBook;
use super::valuation_calculator::calculate_valuation;
use super::valuation_model::PortfolioValuation;
use crate::errors::{Error, Result};
use crate::portfolio::projection::Projector;
use crate::portfolios::Portfolio;
use crate::transactions::Transaction;

/// Values a ledger on arbitrary dates by replaying it as of each date.
#[derive(Clone)]
pub struct ValuationService {
    market_data: Arc<dyn MarketDataAdapter>,
}

impl ValuationService {
    pub fn new(market_data: Arc<dyn MarketDataAdapter>) -> Self {
        Self { market_data }
    }

    /// One valuation per requested date, in the order given.
    pub async fn value_on_dates(
        &self,
        portfolio: &Portfolio,
        ledger: &[Transaction],
        dates: &[NaiveDate],
    ) -> Result<Vec<PortfolioValuation>> {
        let (Some(first), Some(last)) = (dates.iter().min(), dates.iter().max()) else {
            return Ok(Vec::new());
        };
        let symbols: Vec<String> = ledger
            .iter()
            .filter(|tx| tx.trade_date <= *last)
            .flat_map(|tx| std::iter::once(tx.symbol.clone()).chain(tx.related_symbol.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let prices = PriceBook::load(self.market_data.as_ref(), &symbols, *first, *last).await;
        debug!(
            "Valuing portfolio {} on {} dates over {} symbols",
            portfolio.id,
            dates.len(),
            symbols.len()
        );

        dates
            .iter()
            .map(|date| {
                let projection = Projector::new(&portfolio.id, portfolio.cost_basis_method)
                    .project_as_of(ledger, *date)?;
                Ok(calculate_valuation(&portfolio.id, &projection, *date, &prices))
            })
            .collect()
    }

    pub async fn value_on(
        &self,
        portfolio: &Portfolio,
        ledger: &[Transaction],
        date: NaiveDate,
    ) -> Result<PortfolioValuation> {
        self.value_on_dates(portfolio, ledger, &[date])
            .await?
            .pop()
            .ok_or_else(|| Error::Unexpected(format!("no valuation produced for {}", date)))
    }
}
