//! SQLite storage implementation for the ledger and import batches.

mod model;
mod repository;

pub use model::{ImportBatchDB, TransactionDB};
pub use repository::TransactionRepository;

// Re-export trait from core for convenience
pub use folioledger_core::transactions::TransactionRepositoryTrait;
