//! Ledger repository and service traits.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::ledger_write::LedgerWrite;
use super::transactions_import::{ImportRequest, ImportResult};
use super::transactions_model::{
    ImportBatch, NewTransaction, Transaction, TransactionQuery, TransactionUpdate,
};
use crate::errors::Result;

/// Persistence contract for the ledger.
///
/// `commit` is the only write path: ledger rows, the replacement projection,
/// the optional portfolio row, batch row and proposal are written in one
/// database transaction or not at all.
#[async_trait]
pub trait TransactionRepositoryTrait: Send + Sync {
    fn get_by_id(&self, portfolio_id: &str, transaction_id: &str) -> Result<Option<Transaction>>;
    fn list(&self, query: &TransactionQuery) -> Result<Vec<Transaction>>;
    /// Entries in ledger order.
    fn list_by_portfolio(&self, portfolio_id: &str) -> Result<Vec<Transaction>>;
    fn get_batch(&self, portfolio_id: &str, batch_id: &str) -> Result<Option<ImportBatch>>;
    fn list_batches(&self, portfolio_id: &str) -> Result<Vec<ImportBatch>>;
    fn first_trade_date(&self, portfolio_id: &str) -> Result<Option<NaiveDate>>;
    async fn commit(&self, write: LedgerWrite) -> Result<()>;
}

#[async_trait]
pub trait TransactionServiceTrait: Send + Sync {
    async fn append(&self, user_id: &str, transaction: NewTransaction) -> Result<Transaction>;

    async fn edit(
        &self,
        user_id: &str,
        portfolio_id: &str,
        transaction_id: &str,
        update: TransactionUpdate,
    ) -> Result<Transaction>;

    async fn delete(&self, user_id: &str, portfolio_id: &str, transaction_id: &str)
        -> Result<()>;

    /// Deletes the batch and its entries. Returns the number of entries removed.
    async fn delete_batch(&self, user_id: &str, portfolio_id: &str, batch_id: &str)
        -> Result<usize>;

    fn query(&self, user_id: &str, query: &TransactionQuery) -> Result<Vec<Transaction>>;

    fn list_batches(&self, user_id: &str, portfolio_id: &str) -> Result<Vec<ImportBatch>>;

    async fn import_transactions(
        &self,
        user_id: &str,
        portfolio_id: &str,
        request: ImportRequest,
    ) -> Result<ImportResult>;
}
