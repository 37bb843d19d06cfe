use super::*;
use rust_decimal_macros::dec;

use crate::errors::ErrorKind;
use crate::portfolios::CostBasisMethod;
use crate::test_support::{d, market_data, tx, Fixture, OWNER, STRANGER};
use crate::transactions::TransactionType;

async fn seeded() -> Fixture {
    let fx = Fixture::new(CostBasisMethod::Fifo).await;
    fx.seed(
        &fx.portfolio,
        vec![
            tx("b1", TransactionType::Buy, "AAPL", d(2024, 1, 2))
                .qty(dec!(10))
                .price(dec!(100))
                .build(),
            tx("b2", TransactionType::Buy, "MSFT", d(2024, 1, 3))
                .qty(dec!(2))
                .price(dec!(400))
                .build(),
            tx("s1", TransactionType::Sell, "MSFT", d(2024, 2, 3))
                .qty(dec!(2))
                .price(dec!(410))
                .build(),
            tx("b3", TransactionType::Buy, "VTI", d(2024, 1, 4))
                .qty(dec!(4))
                .price(dec!(200))
                .build(),
        ],
    )
    .await;
    fx
}

#[tokio::test]
async fn test_enrichment_adds_market_fields_when_quote_exists() {
    let fx = seeded().await;
    let prices = market_data(&[
        ("AAPL", d(2024, 6, 27), dec!(120)),
        ("AAPL", d(2024, 6, 28), dec!(125)),
    ]);
    let service = HoldingsService::new(fx.access.clone(), fx.store.clone(), prices);

    let views = service.get_holdings(OWNER, "p1", true).await.unwrap();
    // The fully sold MSFT position is gone.
    assert_eq!(views.len(), 2);

    let aapl = views.iter().find(|v| v.holding.symbol == "AAPL").unwrap();
    assert_eq!(aapl.market_price, Some(dec!(125)));
    assert_eq!(aapl.market_value, Some(dec!(1250)));
    assert_eq!(aapl.unrealized_gain, Some(dec!(250)));
    assert_eq!(aapl.unrealized_gain_pct, Some(dec!(25)));
    assert_eq!(aapl.day_change, Some(dec!(50)));
    assert_eq!(aapl.price_date, Some(d(2024, 6, 28)));

    let vti = views.iter().find(|v| v.holding.symbol == "VTI").unwrap();
    assert_eq!(vti.market_price, None);
    assert_eq!(vti.market_value, None);
    assert_eq!(vti.holding.cost_basis, dec!(800));
}

#[tokio::test]
async fn test_plain_listing_skips_market_lookup() {
    let fx = seeded().await;
    let prices = market_data(&[("AAPL", d(2024, 6, 28), dec!(125))]);
    let service = HoldingsService::new(fx.access.clone(), fx.store.clone(), prices);

    let views = service.get_holdings(OWNER, "p1", false).await.unwrap();
    assert!(views.iter().all(|v| v.market_price.is_none()));
    let aapl = views.iter().find(|v| v.holding.symbol == "AAPL").unwrap();
    assert_eq!(aapl.holding.average_cost, dec!(100));
    assert_eq!(aapl.holding.inception_date, d(2024, 1, 2));
}

#[tokio::test]
async fn test_holdings_are_owner_scoped() {
    let fx = seeded().await;
    let service = HoldingsService::new(fx.access.clone(), fx.store.clone(), market_data(&[]));

    let err = service.get_holdings(STRANGER, "p1", false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = service.get_holdings(OWNER, "missing", false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
