//! Temp-file databases for repository tests.

use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tempfile::TempDir;

use folioledger_core::portfolios::{CostBasisMethod, NewPortfolio, Portfolio, PortfolioRepositoryTrait};
use folioledger_core::users::{NewUser, UserRepositoryTrait};

use crate::db::{open, DbConfig, DbPool, WriteHandle};
use crate::portfolios::PortfolioRepository;
use crate::users::UserRepository;

pub struct TestDb {
    pub pool: Arc<DbPool>,
    pub writer: WriteHandle,
    // Keeps the database file alive for the test's duration.
    _dir: TempDir,
}

pub fn test_db() -> TestDb {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let config = DbConfig {
        path: dir.path().join("test.db").to_string_lossy().to_string(),
        max_connections: 4,
        min_idle: 1,
    };
    let (pool, writer) = open(&config).expect("Failed to open test database");
    TestDb {
        pool,
        writer,
        _dir: dir,
    }
}

impl TestDb {
    /// Creates `owner` (if needed) and a FIFO portfolio with the given id.
    pub async fn portfolio(&self, owner: &str, portfolio_id: &str) -> Portfolio {
        let users = UserRepository::new(self.pool.clone(), self.writer.clone());
        if users.get_by_id(owner).is_err() {
            users
                .create(NewUser {
                    id: Some(owner.to_string()),
                    email: format!("{}@example.com", owner),
                    password_hash: "hash".to_string(),
                })
                .await
                .expect("Failed to create user");
        }
        PortfolioRepository::new(self.pool.clone(), self.writer.clone())
            .create(NewPortfolio {
                id: Some(portfolio_id.to_string()),
                owner_id: owner.to_string(),
                name: format!("Portfolio {}", portfolio_id),
                base_currency: "USD".to_string(),
                cost_basis_method: CostBasisMethod::Fifo,
            })
            .await
            .expect("Failed to create portfolio")
    }
}

pub fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn at(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, 0, 0).unwrap()
}
