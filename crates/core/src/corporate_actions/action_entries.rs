//! Ledger entries synthesized when a corporate action is applied to a portfolio.

use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;

use super::corporate_actions_model::{describe, CorporateAction, CorporateActionKind};
use crate::errors::Result;
use crate::transactions::{NewTransaction, Transaction, TransactionType};
use crate::utils::decimal_utils::round_intermediate;

/// Builds the audit entries for applying `action` to a position of `shares`.
///
/// MERGER and SPINOFF produce a pair: the primary leg on the old symbol drives
/// the replay, the receiving leg on the new symbol is a record only.
pub fn synthesize_entries(
    action: &CorporateAction,
    portfolio_id: &str,
    currency: &str,
    shares: Decimal,
    created_at: NaiveDateTime,
) -> Result<Vec<Transaction>> {
    let base = NewTransaction {
        id: None,
        portfolio_id: portfolio_id.to_string(),
        transaction_type: TransactionType::Split,
        symbol: action.symbol.clone(),
        trade_date: action.ex_date,
        quantity: shares,
        price: None,
        commission: Decimal::ZERO,
        currency: currency.to_string(),
        notes: Some(describe(action, shares)),
        import_batch_id: None,
        ratio: None,
        related_symbol: None,
        basis_fraction: None,
        lot_selections: Vec::new(),
        corporate_action_id: Some(action.id.clone()),
    };

    let mut entries: Vec<NewTransaction> = Vec::new();
    match &action.kind {
        CorporateActionKind::Split { ratio } => entries.push(NewTransaction {
            ratio: Some(*ratio),
            ..base
        }),
        CorporateActionKind::Dividend { amount, currency } => entries.push(NewTransaction {
            transaction_type: TransactionType::Dividend,
            price: Some(*amount),
            currency: currency.clone(),
            ..base
        }),
        CorporateActionKind::Merger { ratio, new_symbol } => {
            entries.extend(exchange_pair(base, TransactionType::Merger, *ratio, new_symbol, None));
        }
        CorporateActionKind::Spinoff {
            ratio,
            new_symbol,
            basis_fraction,
        } => {
            entries.extend(exchange_pair(
                base,
                TransactionType::Spinoff,
                *ratio,
                new_symbol,
                *basis_fraction,
            ));
        }
        CorporateActionKind::TickerChange { new_symbol } => entries.push(NewTransaction {
            transaction_type: TransactionType::TickerChange,
            related_symbol: Some(new_symbol.clone()),
            ..base
        }),
    }

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            entry.validate()?;
            Ok(entry.into_transaction(created_at + Duration::microseconds(i as i64)))
        })
        .collect()
}

fn exchange_pair(
    base: NewTransaction,
    transaction_type: TransactionType,
    ratio: Decimal,
    new_symbol: &str,
    basis_fraction: Option<Decimal>,
) -> [NewTransaction; 2] {
    let receiving = NewTransaction {
        transaction_type,
        symbol: new_symbol.to_string(),
        quantity: round_intermediate(base.quantity * ratio),
        related_symbol: Some(base.symbol.clone()),
        ..base.clone()
    };
    let primary = NewTransaction {
        transaction_type,
        ratio: Some(ratio),
        related_symbol: Some(new_symbol.to_string()),
        basis_fraction,
        ..base
    };
    [primary, receiving]
}
