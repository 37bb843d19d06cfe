use async_trait::async_trait;
use log::{debug, warn};
use rust_decimal::Decimal;
use std::sync::Arc;

use folioledger_market_data::{MarketDataAdapter, Quote};

use super::holdings_model::{Holding, HoldingView};
use super::holdings_traits::{HoldingRepositoryTrait, HoldingsServiceTrait};
use crate::errors::Result;
use crate::portfolios::PortfolioAccess;
use crate::utils::decimal_utils::{ratio_to_percent, round_intermediate, safe_div};

pub struct HoldingsService {
    access: PortfolioAccess,
    repository: Arc<dyn HoldingRepositoryTrait>,
    market_data: Arc<dyn MarketDataAdapter>,
}

impl HoldingsService {
    pub fn new(
        access: PortfolioAccess,
        repository: Arc<dyn HoldingRepositoryTrait>,
        market_data: Arc<dyn MarketDataAdapter>,
    ) -> Self {
        Self {
            access,
            repository,
            market_data,
        }
    }
}

/// Adds market value, unrealized gain and day change from a quote.
pub fn enrich_holding(holding: Holding, quote: &Quote) -> HoldingView {
    let price = quote.close;
    let market_value = round_intermediate(holding.quantity * price);
    let unrealized_gain = market_value - holding.cost_basis;
    let unrealized_gain_pct = if holding.cost_basis.is_zero() {
        None
    } else {
        Some(ratio_to_percent(safe_div(unrealized_gain, holding.cost_basis)))
    };
    let (day_change, day_change_pct) = match quote.previous_close {
        Some(prev) if !prev.is_zero() => (
            Some(round_intermediate(holding.quantity * (price - prev))),
            Some(ratio_to_percent(safe_div(price - prev, prev))),
        ),
        _ => (None, None),
    };

    HoldingView {
        market_price: Some(price),
        market_value: Some(market_value),
        unrealized_gain: Some(unrealized_gain),
        unrealized_gain_pct,
        day_change,
        day_change_pct,
        price_date: Some(quote.date()),
        holding,
    }
}

#[async_trait]
impl HoldingsServiceTrait for HoldingsService {
    async fn get_holdings(
        &self,
        user_id: &str,
        portfolio_id: &str,
        enrich: bool,
    ) -> Result<Vec<HoldingView>> {
        self.access.authorize(user_id, portfolio_id)?;
        let holdings: Vec<Holding> = self
            .repository
            .list_holdings(portfolio_id)?
            .into_iter()
            .filter(|h| h.quantity != Decimal::ZERO)
            .collect();
        if !enrich || holdings.is_empty() {
            return Ok(holdings.into_iter().map(HoldingView::from).collect());
        }

        let symbols: Vec<String> = holdings.iter().map(|h| h.symbol.clone()).collect();
        let quotes = self.market_data.get_quotes(&symbols).await;
        debug!(
            "Enriching {} holdings of portfolio {} with {} quotes",
            holdings.len(),
            portfolio_id,
            quotes.len()
        );

        Ok(holdings
            .into_iter()
            .map(|holding| match quotes.get(&holding.symbol) {
                Some(quote) => enrich_holding(holding, quote),
                None => {
                    warn!(
                        "No quote for {}; holding returned without market fields",
                        holding.symbol
                    );
                    HoldingView::from(holding)
                }
            })
            .collect())
    }
}
