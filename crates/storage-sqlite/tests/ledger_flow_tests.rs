//! The core's ledger services running on the SQLite repositories.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use folioledger_core::errors::ErrorKind;
use folioledger_core::portfolio::holdings::HoldingRepositoryTrait;
use folioledger_core::portfolios::{
    CostBasisMethod, NewPortfolio, PortfolioAccess, PortfolioLocks, PortfolioService,
    PortfolioServiceTrait, PortfolioUpdate,
};
use folioledger_core::transactions::{
    LedgerWriter, NewTransaction, TransactionService, TransactionServiceTrait, TransactionType,
};
use folioledger_core::users::{NewUser, UserRepositoryTrait};
use folioledger_storage_sqlite::portfolio::holdings::HoldingRepository;
use folioledger_storage_sqlite::portfolios::PortfolioRepository;
use folioledger_storage_sqlite::transactions::TransactionRepository;
use folioledger_storage_sqlite::users::UserRepository;
use folioledger_storage_sqlite::{open, DbConfig};

fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn trade(
    portfolio_id: &str,
    kind: TransactionType,
    date: NaiveDate,
    quantity: Decimal,
    price: Decimal,
) -> NewTransaction {
    NewTransaction {
        id: None,
        portfolio_id: portfolio_id.to_string(),
        transaction_type: kind,
        symbol: "aapl".to_string(),
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
        lot_selections: Vec::new(),
        corporate_action_id: None,
    }
}

#[tokio::test]
async fn test_ledger_services_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig {
        path: dir.path().join("ledger.db").to_string_lossy().to_string(),
        max_connections: 4,
        min_idle: 1,
    };
    let (pool, writer) = open(&config).unwrap();

    let users = UserRepository::new(pool.clone(), writer.clone());
    let owner = users
        .create(NewUser {
            id: None,
            email: "owner@example.com".to_string(),
            password_hash: "hash".to_string(),
        })
        .await
        .unwrap();

    let portfolio_repo = Arc::new(PortfolioRepository::new(pool.clone(), writer.clone()));
    let transaction_repo = Arc::new(TransactionRepository::new(pool.clone(), writer.clone()));
    let holdings = HoldingRepository::new(pool.clone());
    let access = PortfolioAccess::new(portfolio_repo, PortfolioLocks::new());
    let portfolios = PortfolioService::new(access.clone(), LedgerWriter::new(transaction_repo.clone()));
    let ledger = TransactionService::new(access, transaction_repo);

    let portfolio = portfolios
        .create_portfolio(
            &owner.id,
            NewPortfolio {
                id: None,
                owner_id: String::new(),
                name: "Taxable".to_string(),
                base_currency: "USD".to_string(),
                cost_basis_method: CostBasisMethod::Fifo,
            },
        )
        .await
        .unwrap();
    let pid = portfolio.id.clone();

    ledger
        .append(&owner.id, trade(&pid, TransactionType::Buy, d(2024, 1, 2), dec!(10), dec!(100)))
        .await
        .unwrap();
    ledger
        .append(&owner.id, trade(&pid, TransactionType::Buy, d(2024, 2, 1), dec!(10), dec!(120)))
        .await
        .unwrap();
    ledger
        .append(&owner.id, trade(&pid, TransactionType::Sell, d(2024, 3, 1), dec!(5), dec!(150)))
        .await
        .unwrap();

    let position = &holdings.list_holdings(&pid).unwrap()[0];
    assert_eq!(position.symbol, "AAPL");
    assert_eq!(position.quantity, dec!(15));
    assert_eq!(position.cost_basis, dec!(1700));

    let err = ledger
        .append(&owner.id, trade(&pid, TransactionType::Sell, d(2024, 3, 2), dec!(50), dec!(150)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientShares);
    assert_eq!(holdings.list_holdings(&pid).unwrap()[0].quantity, dec!(15));

    // Switching to LIFO replays the sale against the February lot.
    portfolios
        .update_portfolio(
            &owner.id,
            PortfolioUpdate {
                id: pid.clone(),
                name: "Taxable".to_string(),
                cost_basis_method: CostBasisMethod::Lifo,
            },
        )
        .await
        .unwrap();
    assert_eq!(holdings.list_holdings(&pid).unwrap()[0].cost_basis, dec!(1600));
    assert_eq!(holdings.list_realized_gains(&pid).unwrap()[0].gain, dec!(150));

    let err = portfolios.get_portfolio("someone-else", &pid).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    portfolios.delete_portfolio(&owner.id, &pid).await.unwrap();
    assert!(holdings.list_holdings(&pid).unwrap().is_empty());
}
