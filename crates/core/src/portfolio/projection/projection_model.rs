use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::portfolio::holdings::Holding;
use crate::portfolio::tax_lots::{RealizedGain, TaxLot};

/// Derived state of (part of) a portfolio's ledger.
///
/// Holdings are sorted by symbol, lots and realized gains keep the order in
/// which replay produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub holdings: Vec<Holding>,
    pub lots: Vec<TaxLot>,
    pub realized_gains: Vec<RealizedGain>,
}

impl Projection {
    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.iter().find(|h| h.symbol == symbol)
    }

    /// Held quantity, zero when there is no holding.
    pub fn quantity_of(&self, symbol: &str) -> Decimal {
        self.holding(symbol)
            .map(|h| h.quantity)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn open_lots<'a>(&'a self, symbol: &'a str) -> impl Iterator<Item = &'a TaxLot> + 'a {
        self.lots
            .iter()
            .filter(move |lot| lot.symbol == symbol && lot.is_open())
    }

    pub fn symbols(&self) -> Vec<String> {
        self.holdings.iter().map(|h| h.symbol.clone()).collect()
    }
}
