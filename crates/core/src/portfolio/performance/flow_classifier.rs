//! Flow classification for performance calculation.
//!
//! Only cash crossing the portfolio boundary is an external flow. Buys bring
//! cash in; sells and cash dividends take it out. Splits, reinvestments,
//! mergers, spinoffs and ticker changes move no cash.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::transactions::{Transaction, TransactionType};
use crate::utils::decimal_utils::round_intermediate;

/// Net external cash on one day. Positive amounts are contributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlow {
    pub date: NaiveDate,
    pub amount: Decimal,
}

pub fn is_external_flow(transaction_type: TransactionType) -> bool {
    matches!(
        transaction_type,
        TransactionType::Buy | TransactionType::Sell | TransactionType::Dividend
    )
}

/// Signed external flow of one entry, or `None` for internal entries.
pub fn classify_flow(transaction: &Transaction) -> Option<Decimal> {
    let gross = transaction.quantity * transaction.price_or_zero();
    let amount = match transaction.transaction_type {
        TransactionType::Buy => gross + transaction.commission,
        TransactionType::Sell => -(gross - transaction.commission),
        TransactionType::Dividend => -gross,
        _ => return None,
    };
    Some(round_intermediate(amount))
}

/// External flows dated in `(after, through]`, netted per day in date order.
pub fn external_flows(ledger: &[Transaction], after: NaiveDate, through: NaiveDate) -> Vec<CashFlow> {
    let mut by_date: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for tx in ledger
        .iter()
        .filter(|tx| tx.trade_date > after && tx.trade_date <= through)
    {
        if let Some(amount) = classify_flow(tx) {
            *by_date.entry(tx.trade_date).or_default() += amount;
        }
    }
    by_date
        .into_iter()
        .map(|(date, amount)| CashFlow { date, amount })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn entry(kind: TransactionType, day: u32, qty: Decimal, price: Option<Decimal>) -> Transaction {
        let at: NaiveDateTime = d(1).and_hms_opt(0, 0, 0).unwrap();
        Transaction {
            id: format!("{}-{}", kind, day),
            portfolio_id: "p1".to_string(),
            transaction_type: kind,
            symbol: "AAPL".to_string(),
            trade_date: d(day),
            quantity: qty,
            price,
            commission: dec!(1),
            currency: "USD".to_string(),
            notes: None,
            import_batch_id: None,
            ratio: if kind == TransactionType::Split { Some(dec!(2)) } else { None },
            related_symbol: None,
            basis_fraction: None,
            lot_selections: vec![],
            corporate_action_id: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_buy_is_contribution_including_commission() {
        let buy = entry(TransactionType::Buy, 2, dec!(10), Some(dec!(100)));
        assert_eq!(classify_flow(&buy), Some(dec!(1001)));
    }

    #[test]
    fn test_sell_is_withdrawal_net_of_commission() {
        let sell = entry(TransactionType::Sell, 2, dec!(5), Some(dec!(150)));
        assert_eq!(classify_flow(&sell), Some(dec!(-749)));
    }

    #[test]
    fn test_dividend_is_outflow() {
        let dividend = entry(TransactionType::Dividend, 2, dec!(100), Some(dec!(0.24)));
        assert_eq!(classify_flow(&dividend), Some(dec!(-24)));
    }

    #[test]
    fn test_internal_entries_are_not_flows() {
        for kind in [
            TransactionType::Split,
            TransactionType::DividendReinvest,
            TransactionType::TickerChange,
            TransactionType::Merger,
            TransactionType::Spinoff,
        ] {
            assert!(!is_external_flow(kind));
            assert_eq!(classify_flow(&entry(kind, 2, dec!(1), Some(dec!(10)))), None);
        }
    }

    #[test]
    fn test_flows_are_netted_per_day_inside_half_open_window() {
        let ledger = vec![
            entry(TransactionType::Buy, 1, dec!(1), Some(dec!(100))),
            entry(TransactionType::Buy, 5, dec!(1), Some(dec!(100))),
            entry(TransactionType::Sell, 5, dec!(1), Some(dec!(50))),
            entry(TransactionType::Buy, 9, dec!(1), Some(dec!(10))),
        ];
        let flows = external_flows(&ledger, d(1), d(8));
        assert_eq!(
            flows,
            vec![CashFlow {
                date: d(5),
                amount: dec!(52)
            }]
        );
    }
}
