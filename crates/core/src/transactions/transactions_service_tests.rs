use super::*;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::errors::ErrorKind;
use crate::portfolio::holdings::HoldingRepositoryTrait;
use crate::portfolios::CostBasisMethod;
use crate::test_support::{d, tx, Fixture, OWNER, STRANGER};

fn service(fx: &Fixture) -> TransactionService {
    TransactionService::new(fx.access.clone(), fx.store.clone())
}

fn entry(
    kind: TransactionType,
    symbol: &str,
    date: NaiveDate,
    quantity: Decimal,
    price: Decimal,
) -> NewTransaction {
    NewTransaction {
        id: None,
        portfolio_id: "p1".to_string(),
        transaction_type: kind,
        symbol: symbol.to_string(),
        trade_date: date,
        quantity,
        price: Some(price),
        commission: Decimal::ZERO,
        currency: "USD".to_string(),
        notes: None,
        import_batch_id: None,
        ratio: None,
        related_symbol: None,
        basis_fraction: None,
        lot_selections: vec![],
        corporate_action_id: None,
    }
}

fn record(line: usize, kind: &str, symbol: &str, quantity: Decimal) -> ImportRecord {
    ImportRecord {
        line,
        transaction_type: kind.to_string(),
        symbol: symbol.to_string(),
        trade_date: d(2024, 2, 1),
        quantity,
        price: Some(dec!(50)),
        commission: Decimal::ZERO,
        currency: "USD".to_string(),
        notes: None,
        raw_data: format!("{},{},{}", kind, symbol, quantity),
    }
}

#[tokio::test]
async fn test_buy_buy_sell_projects_fifo_position() {
    let fx = Fixture::new(CostBasisMethod::Fifo).await;
    let service = service(&fx);
    service
        .append(OWNER, entry(TransactionType::Buy, "aapl", d(2024, 1, 2), dec!(10), dec!(100)))
        .await
        .unwrap();
    service
        .append(OWNER, entry(TransactionType::Buy, "AAPL", d(2024, 3, 2), dec!(10), dec!(120)))
        .await
        .unwrap();
    let sell = service
        .append(OWNER, entry(TransactionType::Sell, "AAPL", d(2024, 6, 2), dec!(5), dec!(150)))
        .await
        .unwrap();
    assert_eq!(sell.symbol, "AAPL");

    let holding = &fx.holdings_by_symbol("p1")["AAPL"];
    assert_eq!(holding.quantity, dec!(15));
    assert_eq!(holding.cost_basis, dec!(1700));

    let gains = fx.store.list_realized_gains("p1").unwrap();
    assert_eq!(gains.len(), 1);
    assert_eq!(gains[0].cost_basis, dec!(500));
    assert_eq!(gains[0].proceeds, dec!(750));
    assert_eq!(gains[0].gain, dec!(250));
    assert!(!gains[0].long_term);

    let open: Vec<(NaiveDate, Decimal, Decimal)> = fx
        .store
        .list_lots("p1", Some("AAPL"))
        .unwrap()
        .iter()
        .filter(|lot| lot.is_open())
        .map(|lot| (lot.acquisition_date, lot.remaining_quantity, lot.cost_per_share))
        .collect();
    assert_eq!(
        open,
        vec![
            (d(2024, 1, 2), dec!(5), dec!(100)),
            (d(2024, 3, 2), dec!(10), dec!(120)),
        ]
    );
}

#[tokio::test]
async fn test_oversell_is_rejected_and_nothing_changes() {
    let fx = Fixture::new(CostBasisMethod::Fifo).await;
    let service = service(&fx);
    service
        .append(OWNER, entry(TransactionType::Buy, "AAPL", d(2024, 1, 2), dec!(10), dec!(100)))
        .await
        .unwrap();
    let commits = fx.store.commit_count();

    let err = service
        .append(OWNER, entry(TransactionType::Sell, "AAPL", d(2024, 2, 2), dec!(11), dec!(100)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientShares);
    assert!(err.kind().is_conflict_class());
    assert_eq!(fx.store.commit_count(), commits);
    assert_eq!(fx.store.transactions().len(), 1);
    assert_eq!(fx.holdings_by_symbol("p1")["AAPL"].quantity, dec!(10));
}

#[tokio::test]
async fn test_backdated_edit_that_breaks_a_later_sell_is_rejected() {
    let fx = Fixture::new(CostBasisMethod::Fifo).await;
    let service = service(&fx);
    let buy = service
        .append(OWNER, entry(TransactionType::Buy, "AAPL", d(2024, 1, 2), dec!(10), dec!(100)))
        .await
        .unwrap();
    service
        .append(OWNER, entry(TransactionType::Sell, "AAPL", d(2024, 2, 2), dec!(8), dec!(110)))
        .await
        .unwrap();

    let err = service
        .edit(
            OWNER,
            "p1",
            &buy.id,
            TransactionUpdate {
                quantity: Some(dec!(5)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientShares);

    let edited = service
        .edit(
            OWNER,
            "p1",
            &buy.id,
            TransactionUpdate {
                quantity: Some(dec!(12)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.created_at, buy.created_at);
    assert_eq!(fx.holdings_by_symbol("p1")["AAPL"].quantity, dec!(4));
}

#[tokio::test]
async fn test_delete_reprojects_and_drops_empty_holding() {
    let fx = Fixture::new(CostBasisMethod::Fifo).await;
    let service = service(&fx);
    let buy = service
        .append(OWNER, entry(TransactionType::Buy, "MSFT", d(2024, 1, 2), dec!(3), dec!(400)))
        .await
        .unwrap();

    service.delete(OWNER, "p1", &buy.id).await.unwrap();
    assert!(fx.holdings_by_symbol("p1").is_empty());
    assert!(fx.store.list_lots("p1", None).unwrap().is_empty());

    let err = service.delete(OWNER, "p1", &buy.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_synthesized_entries_are_read_only() {
    let fx = Fixture::new(CostBasisMethod::Fifo).await;
    let mut split = tx("split-1", TransactionType::Split, "AAPL", d(2024, 7, 1))
        .qty(dec!(10))
        .ratio(dec!(2))
        .build();
    split.corporate_action_id = Some("ca-1".to_string());
    fx.seed(
        &fx.portfolio,
        vec![
            tx("b1", TransactionType::Buy, "AAPL", d(2024, 1, 2))
                .qty(dec!(10))
                .price(dec!(100))
                .build(),
            split,
        ],
    )
    .await;
    let service = service(&fx);

    let err = service.delete(OWNER, "p1", "split-1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    let err = service
        .edit(OWNER, "p1", "split-1", TransactionUpdate::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let mut forged = entry(TransactionType::Buy, "AAPL", d(2024, 8, 1), dec!(1), dec!(50));
    forged.corporate_action_id = Some("ca-1".to_string());
    let err = service.append(OWNER, forged).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_manual_merger_and_spinoff_need_a_ratio() {
    let fx = Fixture::new(CostBasisMethod::Fifo).await;
    let service = service(&fx);
    service
        .append(
            OWNER,
            entry(TransactionType::Buy, "XYZ", d(2024, 1, 2), dec!(10), dec!(40)),
        )
        .await
        .unwrap();

    for kind in [TransactionType::Merger, TransactionType::Spinoff] {
        let mut leg = entry(kind, "XYZ", d(2024, 6, 3), dec!(10), dec!(0));
        leg.related_symbol = Some("ABC".to_string());
        let err = service.append(OWNER, leg).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
    assert_eq!(fx.store.transactions().len(), 1);

    let mut merger = entry(TransactionType::Merger, "XYZ", d(2024, 6, 3), dec!(10), dec!(0));
    merger.related_symbol = Some("ABC".to_string());
    merger.ratio = Some(dec!(0.5));
    service.append(OWNER, merger).await.unwrap();
}

#[tokio::test]
async fn test_import_is_all_or_nothing_unless_skipping_invalid_rows() {
    let fx = Fixture::new(CostBasisMethod::Fifo).await;
    let service = service(&fx);
    let request = ImportRequest {
        format_tag: "broker-csv".to_string(),
        records: vec![
            record(2, "BUY", "AAPL", dec!(10)),
            record(3, "TRANSFER", "AAPL", dec!(1)),
            record(4, "BUY", "MSFT", dec!(0)),
            record(5, "SELL", "AAPL", dec!(4)),
        ],
        parse_errors: vec![ImportRowError {
            line: 6,
            field: "tradeDate".to_string(),
            message: "unparseable date".to_string(),
            raw_data: "BUY,AAPL,x".to_string(),
        }],
        ..Default::default()
    };

    let strict = service
        .import_transactions(OWNER, "p1", request.clone())
        .await
        .unwrap();
    assert_eq!(strict.total, 5);
    assert_eq!(strict.failed, 3);
    assert_eq!(strict.success, 0);
    assert_eq!(strict.batch_id, None);
    let lines: Vec<usize> = strict.errors.iter().map(|e| e.line).collect();
    assert_eq!(lines, vec![3, 4, 6]);
    assert_eq!(strict.errors[1].field, "quantity");
    assert!(fx.store.transactions().is_empty());

    let dry = service
        .import_transactions(
            OWNER,
            "p1",
            ImportRequest {
                skip_invalid: true,
                dry_run: true,
                ..request.clone()
            },
        )
        .await
        .unwrap();
    assert_eq!(dry.success, 2);
    assert_eq!(dry.skipped, 3);
    assert!(dry.dry_run);
    assert!(fx.store.transactions().is_empty());

    let lenient = service
        .import_transactions(
            OWNER,
            "p1",
            ImportRequest {
                skip_invalid: true,
                ..request
            },
        )
        .await
        .unwrap();
    assert_eq!(lenient.success, 2);
    let batch_id = lenient.batch_id.unwrap();
    let ledger = fx.store.transactions();
    assert_eq!(ledger.len(), 2);
    // Same trade date: file order is kept.
    assert_eq!(ledger[0].transaction_type, TransactionType::Buy);
    assert_eq!(ledger[1].transaction_type, TransactionType::Sell);
    assert_eq!(fx.holdings_by_symbol("p1")["AAPL"].quantity, dec!(6));
    assert_eq!(service.list_batches(OWNER, "p1").unwrap().len(), 1);

    let removed = service.delete_batch(OWNER, "p1", &batch_id).await.unwrap();
    assert_eq!(removed, 2);
    assert!(fx.store.transactions().is_empty());
    assert!(fx.holdings_by_symbol("p1").is_empty());
    assert!(service.list_batches(OWNER, "p1").unwrap().is_empty());
}

#[tokio::test]
async fn test_query_filters_and_scopes_by_owner() {
    let fx = Fixture::new(CostBasisMethod::Fifo).await;
    let service = service(&fx);
    for (symbol, day) in [("AAPL", 2), ("MSFT", 3), ("AAPL", 10)] {
        service
            .append(OWNER, entry(TransactionType::Buy, symbol, d(2024, 1, day), dec!(1), dec!(10)))
            .await
            .unwrap();
    }

    let query = TransactionQuery {
        portfolio_id: "p1".to_string(),
        symbol: Some("aapl".to_string()),
        start_date: Some(d(2024, 1, 1)),
        end_date: Some(d(2024, 1, 5)),
    };
    let found = service.query(OWNER, &query).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].trade_date, d(2024, 1, 2));

    let err = service.query(STRANGER, &query).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let backwards = TransactionQuery {
        start_date: Some(d(2024, 2, 1)),
        ..query
    };
    assert_eq!(
        service.query(OWNER, &backwards).unwrap_err().kind(),
        ErrorKind::Validation
    );
}
