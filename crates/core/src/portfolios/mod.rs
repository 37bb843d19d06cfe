//! Portfolios module - owner-scoped portfolio CRUD, authorization and write locks.

mod portfolios_access;
mod portfolios_model;
mod portfolios_service;
mod portfolios_traits;

pub use portfolios_access::{PortfolioAccess, PortfolioLocks};
pub use portfolios_model::{CostBasisMethod, NewPortfolio, Portfolio, PortfolioUpdate};
pub use portfolios_service::PortfolioService;
pub use portfolios_traits::{PortfolioRepositoryTrait, PortfolioServiceTrait};


#[cfg(test)]
mod portfolios_service_tests;
