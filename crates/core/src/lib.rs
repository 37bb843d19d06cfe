//! FolioLedger Core - Domain entities, services, and traits.
//!
//! This crate contains the portfolio accounting core: the transaction ledger,
//! holding and tax-lot projections, corporate actions, performance and the
//! background jobs. It is database-agnostic and defines traits that are
//! implemented by the `storage-sqlite` crate.

pub mod constants;
pub mod corporate_actions;
pub mod errors;
pub mod jobs;
pub mod portfolio;
pub mod portfolios;
pub mod transactions;
pub mod users;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
