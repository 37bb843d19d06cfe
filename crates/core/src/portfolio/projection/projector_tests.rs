use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::projector::{project, Projector};
use crate::errors::{AccountingError, Error};
use crate::portfolio::tax_lots::LotSelection;
use crate::portfolios::CostBasisMethod;
use crate::transactions::{Transaction, TransactionType};

fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Hands out entries with strictly increasing creation times.
struct LedgerBuilder {
    entries: Vec<Transaction>,
    clock: NaiveDateTime,
}

impl LedgerBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            clock: d(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap(),
        }
    }

    fn push(
        &mut self,
        id: &str,
        kind: TransactionType,
        symbol: &str,
        date: NaiveDate,
        quantity: Decimal,
        price: Option<Decimal>,
    ) -> &mut Transaction {
        self.clock += Duration::seconds(1);
        self.entries.push(Transaction {
            id: id.to_string(),
            portfolio_id: "p1".to_string(),
            transaction_type: kind,
            symbol: symbol.to_string(),
            trade_date: date,
            quantity,
            price,
            commission: Decimal::ZERO,
            currency: "USD".to_string(),
            notes: None,
            import_batch_id: None,
            ratio: None,
            related_symbol: None,
            basis_fraction: None,
            lot_selections: vec![],
            corporate_action_id: None,
            created_at: self.clock,
            updated_at: self.clock,
        });
        self.entries.last_mut().unwrap()
    }

    fn buy(&mut self, id: &str, symbol: &str, date: NaiveDate, qty: Decimal, price: Decimal) {
        self.push(id, TransactionType::Buy, symbol, date, qty, Some(price));
    }

    fn sell(&mut self, id: &str, symbol: &str, date: NaiveDate, qty: Decimal, price: Decimal) -> &mut Transaction {
        self.push(id, TransactionType::Sell, symbol, date, qty, Some(price))
    }

    fn link(
        &mut self,
        id: &str,
        kind: TransactionType,
        symbol: &str,
        date: NaiveDate,
        ratio: Option<Decimal>,
        related: &str,
    ) -> &mut Transaction {
        let tx = self.push(id, kind, symbol, date, dec!(1), None);
        tx.ratio = ratio;
        tx.related_symbol = Some(related.to_string());
        tx
    }
}

fn scenario_one() -> LedgerBuilder {
    let mut ledger = LedgerBuilder::new();
    ledger.buy("b1", "AAPL", d(2024, 1, 2), dec!(10), dec!(100));
    ledger.buy("b2", "AAPL", d(2024, 3, 2), dec!(10), dec!(120));
    ledger.sell("s1", "AAPL", d(2024, 6, 2), dec!(5), dec!(150));
    ledger
}

#[test]
fn test_fifo_buy_buy_sell() {
    let ledger = scenario_one();
    let projection = project("p1", CostBasisMethod::Fifo, &ledger.entries).unwrap();

    let holding = projection.holding("AAPL").unwrap();
    assert_eq!(holding.quantity, dec!(15));
    assert_eq!(holding.cost_basis, dec!(1700));
    assert_eq!(holding.average_cost, dec!(113.3333333333));
    assert_eq!(holding.inception_date, d(2024, 1, 2));

    assert_eq!(projection.realized_gains.len(), 1);
    let gain = &projection.realized_gains[0];
    assert_eq!(gain.id, "s1:b1");
    assert_eq!(gain.cost_basis, dec!(500));
    assert_eq!(gain.proceeds, dec!(750));
    assert_eq!(gain.gain, dec!(250));
    assert!(!gain.long_term);

    let open: Vec<_> = projection.open_lots("AAPL").collect();
    assert_eq!(open.len(), 2);
    assert_eq!(open[0].acquisition_date, d(2024, 1, 2));
    assert_eq!(open[0].remaining_quantity, dec!(5));
    assert_eq!(open[0].cost_per_share, dec!(100));
    assert_eq!(open[1].acquisition_date, d(2024, 3, 2));
    assert_eq!(open[1].remaining_quantity, dec!(10));
    assert_eq!(open[1].cost_per_share, dec!(120));
}

#[test]
fn test_split_scales_open_lots_and_keeps_basis() {
    let mut ledger = scenario_one();
    let split = ledger.push("sp", TransactionType::Split, "AAPL", d(2024, 7, 1), dec!(15), None);
    split.ratio = Some(dec!(2));

    let projection = project("p1", CostBasisMethod::Fifo, &ledger.entries).unwrap();
    let holding = projection.holding("AAPL").unwrap();
    assert_eq!(holding.quantity, dec!(30));
    assert_eq!(holding.cost_basis, dec!(1700));

    let open: Vec<_> = projection.open_lots("AAPL").collect();
    assert_eq!(open[0].remaining_quantity, dec!(10));
    assert_eq!(open[0].original_quantity, dec!(20));
    assert_eq!(open[0].cost_per_share, dec!(50));
    assert_eq!(open[1].remaining_quantity, dec!(20));
    assert_eq!(open[1].cost_per_share, dec!(60));
    // Per-lot basis is untouched by a split.
    assert_eq!(open[1].cost_basis, dec!(1200));
}

#[test]
fn test_sell_more_than_held_fails_with_insufficient_shares() {
    let mut ledger = LedgerBuilder::new();
    ledger.buy("b1", "AAPL", d(2024, 1, 2), dec!(10), dec!(100));
    ledger.sell("s1", "AAPL", d(2024, 2, 2), dec!(11), dec!(100));

    let err = project("p1", CostBasisMethod::Fifo, &ledger.entries).unwrap_err();
    match err {
        Error::Accounting(AccountingError::InsufficientShares {
            symbol,
            date,
            requested,
            available,
        }) => {
            assert_eq!(symbol, "AAPL");
            assert_eq!(date, d(2024, 2, 2));
            assert_eq!(requested, dec!(11));
            assert_eq!(available, dec!(10));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_sell_is_checked_at_its_logical_position() {
    // The buy is dated after the sell, so at the sell's position nothing is held.
    let mut ledger = LedgerBuilder::new();
    ledger.sell("s1", "AAPL", d(2024, 1, 2), dec!(1), dec!(100));
    ledger.buy("b1", "AAPL", d(2024, 1, 3), dec!(10), dec!(100));
    assert!(project("p1", CostBasisMethod::Fifo, &ledger.entries).is_err());

    // Same day: creation time orders the entries.
    let mut ledger = LedgerBuilder::new();
    ledger.buy("b1", "AAPL", d(2024, 1, 2), dec!(10), dec!(100));
    ledger.sell("s1", "AAPL", d(2024, 1, 2), dec!(10), dec!(100));
    let projection = project("p1", CostBasisMethod::Fifo, &ledger.entries).unwrap();
    assert!(projection.holdings.is_empty());
    assert_eq!(projection.lots.len(), 1);
    assert!(!projection.lots[0].is_open());
}

#[test]
fn test_specific_lot_sell_realizes_selected_loss() {
    let mut ledger = LedgerBuilder::new();
    ledger.buy("A", "XYZ", d(2024, 1, 10), dec!(10), dec!(200));
    ledger.buy("B", "XYZ", d(2024, 2, 10), dec!(10), dec!(100));
    let sell = ledger.sell("s1", "XYZ", d(2024, 5, 1), dec!(10), dec!(120));
    sell.lot_selections = vec![LotSelection {
        lot_id: "A".to_string(),
        quantity: dec!(10),
    }];

    let projection = project("p1", CostBasisMethod::SpecificLot, &ledger.entries).unwrap();
    assert_eq!(projection.realized_gains.len(), 1);
    let gain = &projection.realized_gains[0];
    assert_eq!(gain.lot_id, "A");
    assert_eq!(gain.gain, dec!(-800));
    assert!(!gain.long_term);
    let holding = projection.holding("XYZ").unwrap();
    assert_eq!(holding.cost_basis, dec!(1000));
}

#[test]
fn test_lifo_method_consumes_latest_lot() {
    let ledger = scenario_one();
    let projection = project("p1", CostBasisMethod::Lifo, &ledger.entries).unwrap();
    let gain = &projection.realized_gains[0];
    assert_eq!(gain.lot_id, "b2");
    assert_eq!(gain.cost_basis, dec!(600));
    assert_eq!(projection.holding("AAPL").unwrap().cost_basis, dec!(1600));
}

#[test]
fn test_commissions_enter_basis_and_reduce_proceeds_pro_rata() {
    let mut ledger = LedgerBuilder::new();
    ledger.buy("b1", "AAPL", d(2024, 1, 2), dec!(10), dec!(100));
    ledger.entries[0].commission = dec!(10);
    ledger.buy("b2", "AAPL", d(2024, 1, 3), dec!(10), dec!(100));
    ledger.sell("s1", "AAPL", d(2024, 2, 2), dec!(12), dec!(150)).commission = dec!(12);

    let projection = project("p1", CostBasisMethod::Fifo, &ledger.entries).unwrap();
    let gains = &projection.realized_gains;
    assert_eq!(gains.len(), 2);
    assert_eq!(gains[0].cost_basis, dec!(1010));
    assert_eq!(gains[0].proceeds, dec!(1490));
    assert_eq!(gains[1].cost_basis, dec!(200));
    assert_eq!(gains[1].proceeds, dec!(298));
}

#[test]
fn test_long_term_classification_at_365_days() {
    let mut ledger = LedgerBuilder::new();
    ledger.buy("b1", "AAPL", d(2023, 1, 2), dec!(2), dec!(100));
    ledger.sell("s1", "AAPL", d(2024, 1, 1), dec!(1), dec!(100));
    ledger.sell("s2", "AAPL", d(2024, 1, 2), dec!(1), dec!(100));

    let projection = project("p1", CostBasisMethod::Fifo, &ledger.entries).unwrap();
    assert!(!projection.realized_gains[0].long_term);
    assert!(projection.realized_gains[1].long_term);
}

#[test]
fn test_merger_moves_basis_to_new_symbol() {
    let mut ledger = LedgerBuilder::new();
    ledger.buy("b1", "XYZ", d(2023, 1, 2), dec!(10), dec!(100));
    ledger.link("m1", TransactionType::Merger, "XYZ", d(2024, 5, 1), Some(dec!(0.5)), "ABC");
    ledger.link("m2", TransactionType::Merger, "ABC", d(2024, 5, 1), None, "XYZ");

    let projection = project("p1", CostBasisMethod::Fifo, &ledger.entries).unwrap();
    assert!(projection.holding("XYZ").is_none());
    let holding = projection.holding("ABC").unwrap();
    assert_eq!(holding.quantity, dec!(5));
    assert_eq!(holding.cost_basis, dec!(1000));

    let new_lot = projection.open_lots("ABC").next().unwrap();
    assert_eq!(new_lot.id, "m1:b1");
    assert_eq!(new_lot.acquisition_date, d(2023, 1, 2));
    assert_eq!(new_lot.cost_per_share, dec!(200));
    assert_eq!(projection.lots.len(), 2);
}

#[test]
fn test_spinoff_splits_basis_and_keeps_source_lot_open() {
    let mut ledger = LedgerBuilder::new();
    ledger.buy("b1", "XYZ", d(2024, 1, 2), dec!(10), dec!(100));
    ledger.link("so", TransactionType::Spinoff, "XYZ", d(2024, 5, 1), Some(dec!(0.2)), "NEWCO");

    let projection = project("p1", CostBasisMethod::Fifo, &ledger.entries).unwrap();
    let source = projection.holding("XYZ").unwrap();
    assert_eq!(source.quantity, dec!(10));
    assert_eq!(source.cost_basis, dec!(500));
    let spun = projection.holding("NEWCO").unwrap();
    assert_eq!(spun.quantity, dec!(2));
    assert_eq!(spun.cost_basis, dec!(500));
    assert_eq!(spun.average_cost, dec!(250));
}

#[test]
fn test_spinoff_honours_explicit_basis_fraction() {
    let mut ledger = LedgerBuilder::new();
    ledger.buy("b1", "XYZ", d(2024, 1, 2), dec!(10), dec!(100));
    ledger
        .link("so", TransactionType::Spinoff, "XYZ", d(2024, 5, 1), Some(dec!(1)), "NEWCO")
        .basis_fraction = Some(dec!(0.1));

    let projection = project("p1", CostBasisMethod::Fifo, &ledger.entries).unwrap();
    assert_eq!(projection.holding("XYZ").unwrap().cost_basis, dec!(900));
    assert_eq!(projection.holding("NEWCO").unwrap().cost_basis, dec!(100));
}

#[test]
fn test_ticker_change_renames_open_lots() {
    let mut ledger = LedgerBuilder::new();
    ledger.buy("b1", "FB", d(2021, 1, 4), dec!(10), dec!(250));
    ledger.link("tc", TransactionType::TickerChange, "FB", d(2022, 6, 9), None, "META");
    ledger.sell("s1", "META", d(2022, 7, 1), dec!(4), dec!(170));

    let projection = project("p1", CostBasisMethod::Fifo, &ledger.entries).unwrap();
    assert!(projection.holding("FB").is_none());
    let holding = projection.holding("META").unwrap();
    assert_eq!(holding.quantity, dec!(6));
    assert_eq!(holding.inception_date, d(2021, 1, 4));
    let gain = &projection.realized_gains[0];
    assert_eq!(gain.lot_id, "b1");
    assert!(gain.long_term);
}

#[test]
fn test_dividends_do_not_touch_lots() {
    let mut ledger = scenario_one();
    ledger.push("dv", TransactionType::Dividend, "AAPL", d(2024, 8, 1), dec!(15), Some(dec!(0.24)));
    let with_dividend = project("p1", CostBasisMethod::Fifo, &ledger.entries).unwrap();
    let without = project("p1", CostBasisMethod::Fifo, &scenario_one().entries).unwrap();
    assert_eq!(with_dividend, without);
}

#[test]
fn test_reinvested_dividend_opens_lot() {
    let mut ledger = scenario_one();
    ledger.push("dr", TransactionType::DividendReinvest, "AAPL", d(2024, 8, 1), dec!(0.5), Some(dec!(160)));
    let projection = project("p1", CostBasisMethod::Fifo, &ledger.entries).unwrap();
    let holding = projection.holding("AAPL").unwrap();
    assert_eq!(holding.quantity, dec!(15.5));
    assert_eq!(holding.cost_basis, dec!(1780));
}

#[test]
fn test_replay_ignores_input_order() {
    let ledger = scenario_one();
    let mut reversed = ledger.entries.clone();
    reversed.reverse();
    let a = project("p1", CostBasisMethod::Fifo, &ledger.entries).unwrap();
    let b = project("p1", CostBasisMethod::Fifo, &reversed).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_project_as_of_excludes_later_entries() {
    let ledger = scenario_one();
    let projection = Projector::new("p1", CostBasisMethod::Fifo)
        .project_as_of(&ledger.entries, d(2024, 3, 2))
        .unwrap();
    assert_eq!(projection.quantity_of("AAPL"), dec!(20));
    assert!(projection.realized_gains.is_empty());
}
