//! Ledger domain models.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::portfolio::tax_lots::LotSelection;
use crate::utils::money::is_valid_currency_code;
use crate::{errors::ValidationError, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Buy,
    Sell,
    Dividend,
    Split,
    Merger,
    Spinoff,
    TickerChange,
    DividendReinvest,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Buy => "BUY",
            TransactionType::Sell => "SELL",
            TransactionType::Dividend => "DIVIDEND",
            TransactionType::Split => "SPLIT",
            TransactionType::Merger => "MERGER",
            TransactionType::Spinoff => "SPINOFF",
            TransactionType::TickerChange => "TICKER_CHANGE",
            TransactionType::DividendReinvest => "DIVIDEND_REINVEST",
        }
    }

    /// Opens a tax lot.
    pub fn is_acquisition(&self) -> bool {
        matches!(self, TransactionType::Buy | TransactionType::DividendReinvest)
    }

    pub fn requires_price(&self) -> bool {
        matches!(
            self,
            TransactionType::Buy
                | TransactionType::Sell
                | TransactionType::DividendReinvest
                | TransactionType::Dividend
        )
    }

    /// Links two symbols, which ties their replays together.
    pub fn links_symbols(&self) -> bool {
        matches!(
            self,
            TransactionType::Merger | TransactionType::Spinoff | TransactionType::TickerChange
        )
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
            "BUY" => Ok(TransactionType::Buy),
            "SELL" => Ok(TransactionType::Sell),
            "DIVIDEND" => Ok(TransactionType::Dividend),
            "SPLIT" => Ok(TransactionType::Split),
            "MERGER" => Ok(TransactionType::Merger),
            "SPINOFF" => Ok(TransactionType::Spinoff),
            "TICKER_CHANGE" => Ok(TransactionType::TickerChange),
            "DIVIDEND_REINVEST" | "DRIP" => Ok(TransactionType::DividendReinvest),
            other => Err(Error::Validation(ValidationError::field(
                "type",
                format!("unknown transaction type '{}'", other),
            ))),
        }
    }
}

/// One accepted ledger entry.
///
/// Per-variant fields:
/// - `ratio`: SPLIT ratio, or shares-per-share on the outgoing leg of a MERGER/SPINOFF.
/// - `related_symbol`: the other side of a MERGER/SPINOFF/TICKER_CHANGE.
/// - `basis_fraction`: share of basis moved to spun-off shares.
/// - `lot_selections`: explicit lots consumed by a SELL.
///
/// The receiving leg of a MERGER/SPINOFF carries no ratio and is audit only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub portfolio_id: String,
    pub transaction_type: TransactionType,
    pub symbol: String,
    pub trade_date: NaiveDate,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub commission: Decimal,
    pub currency: String,
    pub notes: Option<String>,
    pub import_batch_id: Option<String>,
    pub ratio: Option<Decimal>,
    pub related_symbol: Option<String>,
    pub basis_fraction: Option<Decimal>,
    #[serde(default)]
    pub lot_selections: Vec<LotSelection>,
    pub corporate_action_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Transaction {
    /// Ledger order: trade date, then creation time, then id.
    pub fn logical_cmp(&self, other: &Transaction) -> Ordering {
        self.trade_date
            .cmp(&other.trade_date)
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.id.cmp(&other.id))
    }

    pub fn price_or_zero(&self) -> Decimal {
        self.price.unwrap_or(Decimal::ZERO)
    }

    /// The leg of a MERGER/SPINOFF that transforms the source symbol's lots.
    pub fn is_outgoing_leg(&self) -> bool {
        matches!(
            self.transaction_type,
            TransactionType::Merger | TransactionType::Spinoff
        ) && self.ratio.is_some()
    }

    pub fn is_synthesized(&self) -> bool {
        self.corporate_action_id.is_some()
    }

    fn as_input(&self) -> NewTransaction {
        NewTransaction {
            id: Some(self.id.clone()),
            portfolio_id: self.portfolio_id.clone(),
            transaction_type: self.transaction_type,
            symbol: self.symbol.clone(),
            trade_date: self.trade_date,
            quantity: self.quantity,
            price: self.price,
            commission: self.commission,
            currency: self.currency.clone(),
            notes: self.notes.clone(),
            import_batch_id: self.import_batch_id.clone(),
            ratio: self.ratio,
            related_symbol: self.related_symbol.clone(),
            basis_fraction: self.basis_fraction,
            lot_selections: self.lot_selections.clone(),
            corporate_action_id: self.corporate_action_id.clone(),
        }
    }
}

/// Sorts entries into ledger order.
pub fn sort_logical(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| a.logical_cmp(b));
}

/// Input model for appending a ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub portfolio_id: String,
    pub transaction_type: TransactionType,
    pub symbol: String,
    pub trade_date: NaiveDate,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    #[serde(default)]
    pub commission: Decimal,
    pub currency: String,
    pub notes: Option<String>,
    pub import_batch_id: Option<String>,
    #[serde(default)]
    pub ratio: Option<Decimal>,
    #[serde(default)]
    pub related_symbol: Option<String>,
    #[serde(default)]
    pub basis_fraction: Option<Decimal>,
    #[serde(default)]
    pub lot_selections: Vec<LotSelection>,
    #[serde(default)]
    pub corporate_action_id: Option<String>,
}

impl NewTransaction {
    /// Enforces the per-variant field requirements.
    pub fn validate(&self) -> Result<()> {
        let symbol = self.symbol.trim();
        if symbol.is_empty() {
            return Err(invalid("symbol", "symbol is required"));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(invalid("quantity", "quantity must be greater than zero"));
        }
        if self.commission < Decimal::ZERO {
            return Err(invalid("commission", "commission cannot be negative"));
        }
        if !is_valid_currency_code(self.currency.trim()) {
            return Err(invalid(
                "currency",
                format!("'{}' is not a 3-letter currency code", self.currency),
            ));
        }

        let kind = self.transaction_type;
        match self.price {
            None if kind.requires_price() => {
                return Err(invalid("price", format!("price is required for {}", kind)));
            }
            Some(price) if price < Decimal::ZERO => {
                return Err(invalid("price", "price cannot be negative"));
            }
            _ => {}
        }

        match kind {
            TransactionType::Split => match self.ratio {
                Some(r) if r > Decimal::ZERO => {}
                _ => return Err(invalid("ratio", "SPLIT requires a positive ratio")),
            },
            TransactionType::Merger | TransactionType::Spinoff | TransactionType::TickerChange => {
                let related = self
                    .related_symbol
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or_default();
                if related.is_empty() {
                    return Err(invalid(
                        "relatedSymbol",
                        format!("{} requires the related symbol", kind),
                    ));
                }
                if related.eq_ignore_ascii_case(symbol) {
                    return Err(invalid(
                        "relatedSymbol",
                        "related symbol must differ from symbol",
                    ));
                }
                match self.ratio {
                    Some(r) if r <= Decimal::ZERO => {
                        return Err(invalid("ratio", "ratio must be greater than zero"));
                    }
                    // Only the synthesized receiving leg of an action goes without a ratio.
                    None if kind != TransactionType::TickerChange
                        && self.corporate_action_id.is_none() =>
                    {
                        return Err(invalid("ratio", format!("{} requires a ratio", kind)));
                    }
                    _ => {}
                }
            }
            _ => {}
        }

        if let Some(fraction) = self.basis_fraction {
            if kind != TransactionType::Spinoff {
                return Err(invalid("basisFraction", "only SPINOFF carries a basis fraction"));
            }
            if fraction <= Decimal::ZERO || fraction >= Decimal::ONE {
                return Err(invalid("basisFraction", "basis fraction must be within (0, 1)"));
            }
        }

        if !self.lot_selections.is_empty() {
            if kind != TransactionType::Sell {
                return Err(invalid("lotSelections", "only SELL may select lots"));
            }
            for selection in &self.lot_selections {
                if selection.lot_id.trim().is_empty() {
                    return Err(invalid("lotSelections", "lot id is required"));
                }
                if selection.quantity <= Decimal::ZERO {
                    return Err(invalid(
                        "lotSelections",
                        "selected quantity must be greater than zero",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Builds the ledger entry, normalizing symbols and currency.
    pub fn into_transaction(self, created_at: NaiveDateTime) -> Transaction {
        Transaction {
            id: self
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            portfolio_id: self.portfolio_id,
            transaction_type: self.transaction_type,
            symbol: normalize_symbol(&self.symbol),
            trade_date: self.trade_date,
            quantity: self.quantity,
            price: self.price,
            commission: self.commission,
            currency: self.currency.trim().to_uppercase(),
            notes: self.notes.filter(|n| !n.trim().is_empty()),
            import_batch_id: self.import_batch_id,
            ratio: self.ratio,
            related_symbol: self.related_symbol.as_deref().map(normalize_symbol),
            basis_fraction: self.basis_fraction,
            lot_selections: self.lot_selections,
            corporate_action_id: self.corporate_action_id,
            created_at,
            updated_at: created_at,
        }
    }
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

fn invalid(field: &str, message: impl Into<String>) -> Error {
    Error::Validation(ValidationError::field(field, message))
}

/// Field changes for an existing entry. Unset fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    pub transaction_type: Option<TransactionType>,
    pub symbol: Option<String>,
    pub trade_date: Option<NaiveDate>,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub commission: Option<Decimal>,
    pub currency: Option<String>,
    pub notes: Option<String>,
    pub ratio: Option<Decimal>,
    pub related_symbol: Option<String>,
    pub basis_fraction: Option<Decimal>,
    pub lot_selections: Option<Vec<LotSelection>>,
}

impl TransactionUpdate {
    /// Produces the superseding entry. Identity, position tiebreak and batch stay unchanged.
    pub fn apply_to(self, current: &Transaction, now: NaiveDateTime) -> Result<Transaction> {
        let mut input = current.as_input();
        if let Some(v) = self.transaction_type {
            input.transaction_type = v;
        }
        if let Some(v) = self.symbol {
            input.symbol = v;
        }
        if let Some(v) = self.trade_date {
            input.trade_date = v;
        }
        if let Some(v) = self.quantity {
            input.quantity = v;
        }
        if self.price.is_some() {
            input.price = self.price;
        }
        if let Some(v) = self.commission {
            input.commission = v;
        }
        if let Some(v) = self.currency {
            input.currency = v;
        }
        if self.notes.is_some() {
            input.notes = self.notes;
        }
        if self.ratio.is_some() {
            input.ratio = self.ratio;
        }
        if self.related_symbol.is_some() {
            input.related_symbol = self.related_symbol;
        }
        if self.basis_fraction.is_some() {
            input.basis_fraction = self.basis_fraction;
        }
        if let Some(v) = self.lot_selections {
            input.lot_selections = v;
        }
        input.validate()?;

        let mut updated = input.into_transaction(current.created_at);
        updated.updated_at = now;
        Ok(updated)
    }
}

/// Ledger query: one portfolio, optionally one symbol and an inclusive date range.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    pub portfolio_id: String,
    pub symbol: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TransactionQuery {
    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(invalid("startDate", "start date must not be after end date"));
            }
        }
        Ok(())
    }

    pub fn matches(&self, transaction: &Transaction) -> bool {
        transaction.portfolio_id == self.portfolio_id
            && self
                .symbol
                .as_deref()
                .map(|s| normalize_symbol(s) == transaction.symbol)
                .unwrap_or(true)
            && self.start_date.map(|d| transaction.trade_date >= d).unwrap_or(true)
            && self.end_date.map(|d| transaction.trade_date <= d).unwrap_or(true)
    }
}

/// Group of entries ingested together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    pub id: String,
    pub portfolio_id: String,
    pub format_tag: String,
    pub imported_at: NaiveDateTime,
    pub notes: Option<String>,
}
