//! Transactions module - the append-mostly ledger, bulk import and the write
//! path that keeps projections in step with it.

mod ledger_write;
mod ledger_writer;
mod transactions_import;
mod transactions_model;
mod transactions_service;
mod transactions_traits;

pub use ledger_write::{LedgerWrite, ProjectionReplacement};
pub use ledger_writer::LedgerWriter;
pub use transactions_import::{ImportRecord, ImportRequest, ImportResult, ImportRowError};
pub use transactions_model::{
    normalize_symbol, sort_logical, ImportBatch, NewTransaction, Transaction, TransactionQuery,
    TransactionType, TransactionUpdate,
};
pub use transactions_service::TransactionService;
pub use transactions_traits::{TransactionRepositoryTrait, TransactionServiceTrait};

#[cfg(test)]
mod transactions_service_tests;
