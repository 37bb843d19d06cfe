use async_trait::async_trait;
use chrono::{Datelike, Utc};
use log::{debug, warn};
use std::collections::BTreeSet;
use std::sync::Arc;

use folioledger_market_data::MarketDataAdapter;

use super::lot_allocator::{allocate, AllocationStrategy};
use super::tax_lots_model::{
    HarvestOpportunity, LotSelection, RealizedGain, SaleAllocation, SaleRequest, TaxBucket,
    TaxLot, TaxReport,
};
use super::tax_lots_traits::TaxLotServiceTrait;
use crate::errors::Result;
use crate::portfolio::holdings::HoldingRepositoryTrait;
use crate::portfolio::projection::{
    family_transactions, is_long_term, project, symbol_family, Projection, Projector,
};
use crate::portfolios::{CostBasisMethod, Portfolio, PortfolioAccess};
use crate::transactions::{
    normalize_symbol, LedgerWrite, LedgerWriter, NewTransaction, Transaction,
    TransactionRepositoryTrait, TransactionType,
};
use crate::utils::decimal_utils::{ratio_to_percent, round_intermediate, safe_div};
use crate::utils::time_utils::today_utc;

pub struct TaxLotService {
    access: PortfolioAccess,
    holdings: Arc<dyn HoldingRepositoryTrait>,
    transactions: Arc<dyn TransactionRepositoryTrait>,
    writer: LedgerWriter,
    market_data: Arc<dyn MarketDataAdapter>,
}

impl TaxLotService {
    pub fn new(
        access: PortfolioAccess,
        holdings: Arc<dyn HoldingRepositoryTrait>,
        transactions: Arc<dyn TransactionRepositoryTrait>,
        market_data: Arc<dyn MarketDataAdapter>,
    ) -> Self {
        let writer = LedgerWriter::new(transactions.clone());
        Self {
            access,
            holdings,
            transactions,
            writer,
            market_data,
        }
    }

    /// Builds the SELL entry for a sale request.
    ///
    /// A FIFO/LIFO request that differs from the portfolio's method is resolved
    /// against the lots open at the trade date and stored as explicit selections,
    /// so later replays reproduce it.
    fn build_sale(&self, portfolio: &Portfolio, request: &SaleRequest) -> Result<Transaction> {
        request.validate()?;
        let symbol = normalize_symbol(&request.symbol);

        let lot_selections = match request.method {
            CostBasisMethod::SpecificLot => request.selections.clone(),
            method if method == portfolio.cost_basis_method => Vec::new(),
            method => {
                let ledger = self.transactions.list_by_portfolio(&portfolio.id)?;
                let family = symbol_family(&ledger, [symbol.as_str()]);
                let entries = family_transactions(&ledger, &family);
                let state = Projector::new(&portfolio.id, portfolio.cost_basis_method)
                    .project_as_of(&entries, request.trade_date)?;
                allocate(
                    AllocationStrategy::resolve(method, &[]),
                    &symbol,
                    &state.lots,
                    request.quantity,
                )?
                .into_iter()
                .map(|consumed| LotSelection {
                    lot_id: consumed.lot_id,
                    quantity: consumed.quantity,
                })
                .collect()
            }
        };

        let sale = NewTransaction {
            id: None,
            portfolio_id: portfolio.id.clone(),
            transaction_type: TransactionType::Sell,
            symbol,
            trade_date: request.trade_date,
            quantity: request.quantity,
            price: Some(request.price),
            commission: request.commission,
            currency: request
                .currency
                .clone()
                .unwrap_or_else(|| portfolio.base_currency.clone()),
            notes: request.notes.clone(),
            import_batch_id: None,
            ratio: None,
            related_symbol: None,
            basis_fraction: None,
            lot_selections,
            corporate_action_id: None,
        };
        sale.validate()?;
        Ok(sale.into_transaction(Utc::now().naive_utc()))
    }

    fn summarize(request: &SaleRequest, sale: &Transaction, projection: Projection) -> SaleAllocation {
        let realized_gains: Vec<RealizedGain> = projection
            .realized_gains
            .into_iter()
            .filter(|gain| gain.transaction_id == sale.id)
            .collect();
        SaleAllocation {
            symbol: sale.symbol.clone(),
            method: request.method,
            selections: realized_gains
                .iter()
                .map(|gain| LotSelection {
                    lot_id: gain.lot_id.clone(),
                    quantity: gain.quantity,
                })
                .collect(),
            total_cost_basis: realized_gains.iter().map(|g| g.cost_basis).sum(),
            total_proceeds: realized_gains.iter().map(|g| g.proceeds).sum(),
            total_gain: realized_gains.iter().map(|g| g.gain).sum(),
            realized_gains,
        }
    }
}

#[async_trait]
impl TaxLotServiceTrait for TaxLotService {
    fn list_lots(
        &self,
        user_id: &str,
        portfolio_id: &str,
        symbol: Option<&str>,
        open_only: bool,
    ) -> Result<Vec<TaxLot>> {
        self.access.authorize(user_id, portfolio_id)?;
        let symbol = symbol.map(normalize_symbol);
        let lots = self.holdings.list_lots(portfolio_id, symbol.as_deref())?;
        Ok(lots
            .into_iter()
            .filter(|lot| !open_only || lot.is_open())
            .collect())
    }

    fn list_realized_gains(
        &self,
        user_id: &str,
        portfolio_id: &str,
        year: Option<i32>,
    ) -> Result<Vec<RealizedGain>> {
        self.access.authorize(user_id, portfolio_id)?;
        let gains = self.holdings.list_realized_gains(portfolio_id)?;
        Ok(gains
            .into_iter()
            .filter(|gain| year.map_or(true, |y| gain.disposal_date.year() == y))
            .collect())
    }

    fn preview_sale_allocation(
        &self,
        user_id: &str,
        portfolio_id: &str,
        request: &SaleRequest,
    ) -> Result<SaleAllocation> {
        let portfolio = self.access.authorize(user_id, portfolio_id)?;
        let sale = self.build_sale(&portfolio, request)?;
        let projection = self
            .writer
            .preview(&portfolio, LedgerWrite::new(portfolio_id).insert(sale.clone()))?;
        Ok(Self::summarize(request, &sale, projection))
    }

    async fn allocate_sale(
        &self,
        user_id: &str,
        portfolio_id: &str,
        request: SaleRequest,
    ) -> Result<SaleAllocation> {
        let (portfolio, _guard) = self.access.authorize_for_write(user_id, portfolio_id).await?;
        let sale = self.build_sale(&portfolio, &request)?;
        let projection = self
            .writer
            .apply(&portfolio, LedgerWrite::new(portfolio_id).insert(sale.clone()))
            .await?;
        let allocation = Self::summarize(&request, &sale, projection);
        debug!(
            "Sale of {} {} in portfolio {} consumed {} lots",
            sale.quantity,
            sale.symbol,
            portfolio_id,
            allocation.selections.len()
        );
        Ok(allocation)
    }

    async fn harvest_opportunities(
        &self,
        user_id: &str,
        portfolio_id: &str,
    ) -> Result<Vec<HarvestOpportunity>> {
        self.access.authorize(user_id, portfolio_id)?;
        let open_lots: Vec<TaxLot> = self
            .holdings
            .list_lots(portfolio_id, None)?
            .into_iter()
            .filter(TaxLot::is_open)
            .collect();
        if open_lots.is_empty() {
            return Ok(Vec::new());
        }

        let symbols: Vec<String> = open_lots
            .iter()
            .map(|lot| lot.symbol.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let quotes = self.market_data.get_quotes(&symbols).await;
        let today = today_utc();

        let mut opportunities = Vec::new();
        for lot in open_lots {
            let Some(quote) = quotes.get(&lot.symbol) else {
                warn!("No quote for {}; skipped in harvest scan", lot.symbol);
                continue;
            };
            let cost_basis = lot.remaining_cost_basis();
            let current_value = round_intermediate(lot.remaining_quantity * quote.close);
            if current_value >= cost_basis {
                continue;
            }
            let unrealized_loss = current_value - cost_basis;
            opportunities.push(HarvestOpportunity {
                lot_id: lot.id,
                symbol: lot.symbol,
                acquisition_date: lot.acquisition_date,
                quantity: lot.remaining_quantity,
                cost_basis,
                current_price: quote.close,
                current_value,
                unrealized_loss,
                loss_pct: ratio_to_percent(safe_div(-unrealized_loss, cost_basis)),
                long_term: is_long_term(lot.acquisition_date, today),
            });
        }
        opportunities.sort_by(|a, b| a.unrealized_loss.cmp(&b.unrealized_loss));
        Ok(opportunities)
    }

    fn tax_report(&self, user_id: &str, portfolio_id: &str, year: i32) -> Result<TaxReport> {
        let portfolio = self.access.authorize(user_id, portfolio_id)?;
        let ledger = self.transactions.list_by_portfolio(portfolio_id)?;
        let projection = project(portfolio_id, portfolio.cost_basis_method, &ledger)?;

        let mut short_term = TaxBucket::default();
        let mut long_term = TaxBucket::default();
        for gain in projection
            .realized_gains
            .into_iter()
            .filter(|gain| gain.disposal_date.year() == year)
        {
            if gain.long_term {
                long_term.add(gain);
            } else {
                short_term.add(gain);
            }
        }

        Ok(TaxReport {
            portfolio_id: portfolio_id.to_string(),
            year,
            total_proceeds: short_term.proceeds + long_term.proceeds,
            total_cost_basis: short_term.cost_basis + long_term.cost_basis,
            total_gain: short_term.gain + long_term.gain,
            short_term,
            long_term,
        })
    }
}
