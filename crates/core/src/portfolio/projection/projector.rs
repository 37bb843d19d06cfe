//! Replays a ledger into holdings, tax lots and realized gains.
//!
//! The projector is a pure function of the ordered ledger and the portfolio's
//! cost-basis method. It never reads storage, never consults the clock and
//! never calls back into services, so two replays of the same ledger are
//! identical.

use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::projection_model::Projection;
use crate::constants::{DEFAULT_SPINOFF_BASIS_FRACTION, LONG_TERM_HOLDING_DAYS};
use crate::errors::{AccountingError, Result};
use crate::portfolio::holdings::Holding;
use crate::portfolio::tax_lots::{allocate, AllocationStrategy, RealizedGain, TaxLot};
use crate::portfolios::CostBasisMethod;
use crate::transactions::{sort_logical, Transaction, TransactionType};
use crate::utils::decimal_utils::{is_quantity_significant, round_intermediate, safe_div};

/// True when a disposal on `disposal` of shares acquired on `acquisition` is long-term.
pub fn is_long_term(acquisition: NaiveDate, disposal: NaiveDate) -> bool {
    (disposal - acquisition).num_days() >= LONG_TERM_HOLDING_DAYS
}

pub fn default_spinoff_basis_fraction() -> Decimal {
    Decimal::from_str_exact(DEFAULT_SPINOFF_BASIS_FRACTION).unwrap_or(Decimal::new(5, 1))
}

pub struct Projector<'a> {
    portfolio_id: &'a str,
    method: CostBasisMethod,
    lots: Vec<TaxLot>,
    realized_gains: Vec<RealizedGain>,
}

impl<'a> Projector<'a> {
    pub fn new(portfolio_id: &'a str, method: CostBasisMethod) -> Self {
        Self {
            portfolio_id,
            method,
            lots: Vec::new(),
            realized_gains: Vec::new(),
        }
    }

    /// Replays every entry. Input order does not matter.
    pub fn project(self, transactions: &[Transaction]) -> Result<Projection> {
        self.project_until(transactions, None)
    }

    /// Replays entries traded on or before `as_of`.
    pub fn project_as_of(self, transactions: &[Transaction], as_of: NaiveDate) -> Result<Projection> {
        self.project_until(transactions, Some(as_of))
    }

    fn project_until(
        mut self,
        transactions: &[Transaction],
        as_of: Option<NaiveDate>,
    ) -> Result<Projection> {
        let mut ordered: Vec<Transaction> = transactions
            .iter()
            .filter(|tx| as_of.map_or(true, |d| tx.trade_date <= d))
            .cloned()
            .collect();
        sort_logical(&mut ordered);

        for tx in &ordered {
            self.apply(tx)?;
        }

        debug!(
            "Projected {} entries of portfolio {} into {} lots and {} realized gains",
            ordered.len(),
            self.portfolio_id,
            self.lots.len(),
            self.realized_gains.len()
        );

        Ok(Projection {
            holdings: self.build_holdings(),
            lots: self.lots,
            realized_gains: self.realized_gains,
        })
    }

    fn apply(&mut self, tx: &Transaction) -> Result<()> {
        match tx.transaction_type {
            TransactionType::Buy | TransactionType::DividendReinvest => {
                self.open_lot(tx);
                Ok(())
            }
            TransactionType::Sell => self.dispose(tx),
            TransactionType::Split => {
                self.split(tx);
                Ok(())
            }
            TransactionType::Merger if tx.is_outgoing_leg() => {
                self.exchange(tx, false);
                Ok(())
            }
            TransactionType::Spinoff if tx.is_outgoing_leg() => {
                self.exchange(tx, true);
                Ok(())
            }
            TransactionType::TickerChange => {
                self.rename(tx);
                Ok(())
            }
            // Cash dividends and receiving legs leave lots untouched.
            TransactionType::Dividend | TransactionType::Merger | TransactionType::Spinoff => {
                Ok(())
            }
        }
    }

    fn open_lot(&mut self, tx: &Transaction) {
        let cost_basis = round_intermediate(tx.quantity * tx.price_or_zero() + tx.commission);
        self.lots.push(TaxLot {
            id: tx.id.clone(),
            portfolio_id: self.portfolio_id.to_string(),
            symbol: tx.symbol.clone(),
            acquisition_date: tx.trade_date,
            original_quantity: tx.quantity,
            remaining_quantity: tx.quantity,
            cost_basis,
            cost_per_share: round_intermediate(safe_div(cost_basis, tx.quantity)),
            currency: tx.currency.clone(),
            transaction_id: tx.id.clone(),
        });
    }

    fn open_quantity(&self, symbol: &str) -> Decimal {
        self.lots
            .iter()
            .filter(|lot| lot.symbol == symbol && lot.is_open())
            .map(|lot| lot.remaining_quantity)
            .sum()
    }

    fn dispose(&mut self, tx: &Transaction) -> Result<()> {
        let available = self.open_quantity(&tx.symbol);
        if available < tx.quantity {
            return Err(AccountingError::InsufficientShares {
                symbol: tx.symbol.clone(),
                date: tx.trade_date,
                requested: tx.quantity,
                available,
            }
            .into());
        }

        let strategy = AllocationStrategy::resolve(self.method, &tx.lot_selections);
        let consumed = allocate(strategy, &tx.symbol, &self.lots, tx.quantity)?;
        let price = tx.price_or_zero();

        for consumption in consumed {
            let Some(lot) = self.lots.iter_mut().find(|l| l.id == consumption.lot_id) else {
                continue;
            };
            let quantity = consumption.quantity;
            let commission_share = safe_div(tx.commission * quantity, tx.quantity);
            let cost_basis = round_intermediate(lot.cost_per_share * quantity);
            let proceeds = round_intermediate(quantity * price - commission_share);

            lot.remaining_quantity -= quantity;
            if !is_quantity_significant(&lot.remaining_quantity) {
                lot.remaining_quantity = Decimal::ZERO;
            }

            self.realized_gains.push(RealizedGain {
                id: format!("{}:{}", tx.id, lot.id),
                portfolio_id: self.portfolio_id.to_string(),
                symbol: tx.symbol.clone(),
                lot_id: lot.id.clone(),
                transaction_id: tx.id.clone(),
                acquisition_date: lot.acquisition_date,
                disposal_date: tx.trade_date,
                quantity,
                cost_basis,
                proceeds,
                gain: proceeds - cost_basis,
                long_term: is_long_term(lot.acquisition_date, tx.trade_date),
                currency: lot.currency.clone(),
            });
        }
        Ok(())
    }

    /// Scales every open lot of the symbol; per-lot basis is unchanged.
    fn split(&mut self, tx: &Transaction) {
        let Some(ratio) = tx.ratio.filter(|r| *r > Decimal::ZERO) else {
            return;
        };
        for lot in self
            .lots
            .iter_mut()
            .filter(|lot| lot.symbol == tx.symbol && lot.is_open())
        {
            lot.remaining_quantity *= ratio;
            lot.original_quantity *= ratio;
            lot.cost_per_share = round_intermediate(lot.cost_per_share / ratio);
        }
    }

    /// Moves open lots of the symbol into the related symbol.
    ///
    /// A merger closes the source lot and carries its whole remaining basis.
    /// A spinoff keeps the source lot open and moves `basis_fraction` of its
    /// basis to the new lot. Acquisition dates carry over.
    fn exchange(&mut self, tx: &Transaction, spinoff: bool) {
        let (Some(ratio), Some(target)) = (tx.ratio, tx.related_symbol.as_deref()) else {
            return;
        };
        let fraction = if spinoff {
            tx.basis_fraction.unwrap_or_else(default_spinoff_basis_fraction)
        } else {
            Decimal::ONE
        };

        let mut created = Vec::new();
        for lot in self
            .lots
            .iter_mut()
            .filter(|lot| lot.symbol == tx.symbol && lot.is_open())
        {
            let new_quantity = lot.remaining_quantity * ratio;
            let moved_basis = round_intermediate(lot.remaining_cost_basis() * fraction);

            created.push(TaxLot {
                id: format!("{}:{}", tx.id, lot.id),
                portfolio_id: self.portfolio_id.to_string(),
                symbol: target.to_string(),
                acquisition_date: lot.acquisition_date,
                original_quantity: new_quantity,
                remaining_quantity: new_quantity,
                cost_basis: moved_basis,
                cost_per_share: round_intermediate(safe_div(moved_basis, new_quantity)),
                currency: lot.currency.clone(),
                transaction_id: tx.id.clone(),
            });

            if spinoff {
                let kept = Decimal::ONE - fraction;
                lot.cost_per_share = round_intermediate(lot.cost_per_share * kept);
                lot.cost_basis = round_intermediate(lot.cost_basis * kept);
            } else {
                lot.remaining_quantity = Decimal::ZERO;
            }
        }
        self.lots.extend(created);
    }

    fn rename(&mut self, tx: &Transaction) {
        let Some(target) = tx.related_symbol.as_deref() else {
            return;
        };
        for lot in self
            .lots
            .iter_mut()
            .filter(|lot| lot.symbol == tx.symbol && lot.is_open())
        {
            lot.symbol = target.to_string();
            lot.transaction_id = tx.id.clone();
        }
    }

    /// Aggregates open lots per symbol. Insignificant positions produce no holding.
    fn build_holdings(&self) -> Vec<Holding> {
        let mut by_symbol: BTreeMap<&str, Vec<&TaxLot>> = BTreeMap::new();
        for lot in self.lots.iter().filter(|lot| lot.is_open()) {
            by_symbol.entry(lot.symbol.as_str()).or_default().push(lot);
        }

        by_symbol
            .into_iter()
            .filter_map(|(symbol, lots)| {
                let quantity: Decimal = lots.iter().map(|lot| lot.remaining_quantity).sum();
                if !is_quantity_significant(&quantity) {
                    return None;
                }
                let cost_basis = round_intermediate(
                    lots.iter()
                        .map(|lot| lot.cost_per_share * lot.remaining_quantity)
                        .sum(),
                );
                let inception_date = lots.iter().map(|lot| lot.acquisition_date).min()?;
                Some(Holding {
                    portfolio_id: self.portfolio_id.to_string(),
                    symbol: symbol.to_string(),
                    quantity,
                    cost_basis,
                    average_cost: round_intermediate(safe_div(cost_basis, quantity)),
                    currency: lots[0].currency.clone(),
                    inception_date,
                })
            })
            .collect()
    }
}

/// Replays `transactions` for a portfolio.
pub fn project(
    portfolio_id: &str,
    method: CostBasisMethod,
    transactions: &[Transaction],
) -> Result<Projection> {
    Projector::new(portfolio_id, method).project(transactions)
}
