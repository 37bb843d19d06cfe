use super::*;
use rust_decimal_macros::dec;

use crate::errors::ErrorKind;
use crate::portfolio::holdings::HoldingRepositoryTrait;
use crate::test_support::{d, tx, Fixture, OWNER, STRANGER};
use crate::transactions::TransactionType;

fn service(fx: &Fixture) -> PortfolioService {
    PortfolioService::new(fx.access.clone(), fx.writer.clone())
}

fn named(name: &str) -> NewPortfolio {
    NewPortfolio {
        id: None,
        owner_id: String::new(),
        name: name.to_string(),
        base_currency: "eur".to_string(),
        cost_basis_method: CostBasisMethod::Fifo,
    }
}

#[tokio::test]
async fn test_create_assigns_owner_and_normalizes() {
    let fx = Fixture::new(CostBasisMethod::Fifo).await;
    let service = service(&fx);

    let created = service
        .create_portfolio(OWNER, named("  Retirement "))
        .await
        .unwrap();
    assert_eq!(created.owner_id, OWNER);
    assert_eq!(created.name, "Retirement");
    assert_eq!(created.base_currency, "EUR");
    assert!(!created.id.is_empty());

    let err = service
        .create_portfolio(OWNER, named("Retirement"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // Names are unique per owner only.
    assert!(service
        .create_portfolio(STRANGER, named("Retirement"))
        .await
        .is_ok());

    let err = service.create_portfolio("", named("Anon")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_access_is_owner_scoped() {
    let fx = Fixture::new(CostBasisMethod::Fifo).await;
    let service = service(&fx);

    assert_eq!(service.get_portfolio(OWNER, "p1").unwrap().name, "Main");
    assert_eq!(
        service.get_portfolio(STRANGER, "p1").unwrap_err().kind(),
        ErrorKind::Forbidden
    );
    assert_eq!(
        service.get_portfolio(OWNER, "nope").unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert!(service.list_portfolios(STRANGER).unwrap().is_empty());
    assert_eq!(service.list_portfolios(OWNER).unwrap().len(), 1);

    let err = service.delete_portfolio(STRANGER, "p1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn test_method_change_replays_realized_gains() {
    let fx = Fixture::new(CostBasisMethod::Fifo).await;
    fx.seed(
        &fx.portfolio,
        vec![
            tx("b1", TransactionType::Buy, "AAPL", d(2024, 1, 2))
                .qty(dec!(10))
                .price(dec!(100))
                .build(),
            tx("b2", TransactionType::Buy, "AAPL", d(2024, 3, 2))
                .qty(dec!(10))
                .price(dec!(120))
                .build(),
            tx("s1", TransactionType::Sell, "AAPL", d(2024, 6, 2))
                .qty(dec!(5))
                .price(dec!(150))
                .build(),
        ],
    )
    .await;
    let service = service(&fx);
    assert_eq!(fx.store.list_realized_gains("p1").unwrap()[0].gain, dec!(250));

    let updated = service
        .update_portfolio(
            OWNER,
            PortfolioUpdate {
                id: "p1".to_string(),
                name: "Main".to_string(),
                cost_basis_method: CostBasisMethod::Lifo,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.cost_basis_method, CostBasisMethod::Lifo);
    assert_eq!(
        service.get_portfolio(OWNER, "p1").unwrap().cost_basis_method,
        CostBasisMethod::Lifo
    );

    let gains = fx.store.list_realized_gains("p1").unwrap();
    assert_eq!(gains.len(), 1);
    assert_eq!(gains[0].lot_id, "b2");
    assert_eq!(gains[0].gain, dec!(150));
    assert_eq!(fx.holdings_by_symbol("p1")["AAPL"].cost_basis, dec!(1600));
}

#[tokio::test]
async fn test_rename_without_method_change_skips_replay() {
    let fx = Fixture::new(CostBasisMethod::Fifo).await;
    let service = service(&fx);
    let commits = fx.store.commit_count();

    let renamed = service
        .update_portfolio(
            OWNER,
            PortfolioUpdate {
                id: "p1".to_string(),
                name: " Renamed ".to_string(),
                cost_basis_method: CostBasisMethod::Fifo,
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Renamed");
    assert_eq!(fx.store.commit_count(), commits);
}

#[tokio::test]
async fn test_delete_removes_portfolio() {
    let fx = Fixture::new(CostBasisMethod::Fifo).await;
    let service = service(&fx);

    service.delete_portfolio(OWNER, "p1").await.unwrap();
    assert_eq!(
        service.get_portfolio(OWNER, "p1").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}
