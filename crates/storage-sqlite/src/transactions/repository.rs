use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::dsl::min;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use log::debug;
use std::sync::Arc;

use folioledger_core::errors::Error;
use folioledger_core::portfolios::Portfolio;
use folioledger_core::transactions::{
    normalize_symbol, sort_logical, ImportBatch, LedgerWrite, Transaction, TransactionQuery,
    TransactionRepositoryTrait,
};
use folioledger_core::Result;

use super::model::{ImportBatchDB, TransactionDB};
use crate::corporate_actions::update_proposal_row;
use crate::db::{get_connection, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::portfolio::holdings::replace_projection;
use crate::portfolios::PortfolioDB;
use crate::schema::{import_batches, portfolios, transactions};
use crate::utils::{chunk_for_sqlite, format_date, parse_date};

pub struct TransactionRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl TransactionRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        TransactionRepository { pool, writer }
    }

    fn to_ledger(rows: Vec<TransactionDB>) -> Result<Vec<Transaction>> {
        let mut ledger = rows
            .into_iter()
            .map(|row| Transaction::try_from(row).into_core())
            .collect::<Result<Vec<_>>>()?;
        sort_logical(&mut ledger);
        Ok(ledger)
    }
}

fn write_portfolio(conn: &mut SqliteConnection, portfolio: Portfolio) -> Result<()> {
    let portfolio_id = portfolio.id.clone();
    let row = PortfolioDB::from(portfolio);
    let affected = diesel::update(portfolios::table.find(&portfolio_id))
        .set(&row)
        .execute(conn)
        .map_err(StorageError::from)?;
    if affected == 0 {
        return Err(Error::not_found("Portfolio", portfolio_id));
    }
    Ok(())
}

fn delete_entries(conn: &mut SqliteConnection, portfolio_id: &str, ids: &[String]) -> Result<usize> {
    let mut removed = 0;
    for chunk in chunk_for_sqlite(ids) {
        removed += diesel::delete(
            transactions::table
                .filter(transactions::portfolio_id.eq(portfolio_id))
                .filter(transactions::id.eq_any(chunk)),
        )
        .execute(conn)
        .map_err(StorageError::from)?;
    }
    Ok(removed)
}

fn update_entry(conn: &mut SqliteConnection, portfolio_id: &str, entry: Transaction) -> Result<()> {
    let entry_id = entry.id.clone();
    let row = TransactionDB::try_from(entry)?;
    let affected = diesel::update(
        transactions::table
            .filter(transactions::portfolio_id.eq(portfolio_id))
            .filter(transactions::id.eq(&entry_id)),
    )
    .set(&row)
    .execute(conn)
    .map_err(StorageError::from)?;
    if affected == 0 {
        return Err(Error::not_found("Transaction", entry_id));
    }
    Ok(())
}

fn insert_entries(conn: &mut SqliteConnection, entries: Vec<Transaction>) -> Result<usize> {
    let rows = entries
        .into_iter()
        .map(TransactionDB::try_from)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let mut inserted = 0;
    // 18 columns per row keeps each statement under the parameter limit.
    for chunk in rows.chunks(50) {
        inserted += diesel::insert_into(transactions::table)
            .values(chunk)
            .execute(conn)
            .map_err(StorageError::from)?;
    }
    Ok(inserted)
}

/// Applies one [`LedgerWrite`] on the writer's connection. The caller's
/// transaction makes it all-or-nothing.
fn apply_write(conn: &mut SqliteConnection, write: LedgerWrite) -> Result<()> {
    let pid = write.portfolio_id;

    if let Some(portfolio) = write.portfolio_update {
        write_portfolio(conn, portfolio)?;
    }
    if let Some(batch) = write.new_batch {
        diesel::insert_into(import_batches::table)
            .values(ImportBatchDB::from(batch))
            .execute(conn)
            .map_err(StorageError::from)?;
    }

    let removed = delete_entries(conn, &pid, &write.deletes)?;
    if let Some(batch_id) = write.deleted_batch_id {
        diesel::delete(
            import_batches::table
                .filter(import_batches::portfolio_id.eq(&pid))
                .filter(import_batches::id.eq(&batch_id)),
        )
        .execute(conn)
        .map_err(StorageError::from)?;
    }

    let updated = write.updates.len();
    for entry in write.updates {
        update_entry(conn, &pid, entry)?;
    }
    let inserted = insert_entries(conn, write.inserts)?;

    if let Some(replacement) = write.projection {
        replace_projection(conn, &pid, replacement)?;
    }
    if let Some(proposal) = write.proposal_update {
        update_proposal_row(conn, proposal)?;
    }

    debug!(
        "Committed ledger write for {}: {} inserted, {} updated, {} deleted",
        pid, inserted, updated, removed
    );
    Ok(())
}

#[async_trait]
impl TransactionRepositoryTrait for TransactionRepository {
    fn get_by_id(&self, portfolio_id: &str, transaction_id: &str) -> Result<Option<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        transactions::table
            .filter(transactions::portfolio_id.eq(portfolio_id))
            .filter(transactions::id.eq(transaction_id))
            .select(TransactionDB::as_select())
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .map(|row| Transaction::try_from(row).into_core())
            .transpose()
    }

    fn list(&self, query: &TransactionQuery) -> Result<Vec<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        let mut sql = transactions::table
            .filter(transactions::portfolio_id.eq(&query.portfolio_id))
            .into_boxed();
        if let Some(symbol) = query.symbol.as_deref() {
            sql = sql.filter(transactions::symbol.eq(normalize_symbol(symbol)));
        }
        if let Some(start) = query.start_date {
            sql = sql.filter(transactions::trade_date.ge(format_date(start)));
        }
        if let Some(end) = query.end_date {
            sql = sql.filter(transactions::trade_date.le(format_date(end)));
        }
        let rows = sql
            .select(TransactionDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?;
        Self::to_ledger(rows)
    }

    fn list_by_portfolio(&self, portfolio_id: &str) -> Result<Vec<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = transactions::table
            .filter(transactions::portfolio_id.eq(portfolio_id))
            .select(TransactionDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?;
        Self::to_ledger(rows)
    }

    fn get_batch(&self, portfolio_id: &str, batch_id: &str) -> Result<Option<ImportBatch>> {
        let mut conn = get_connection(&self.pool)?;
        Ok(import_batches::table
            .filter(import_batches::portfolio_id.eq(portfolio_id))
            .filter(import_batches::id.eq(batch_id))
            .select(ImportBatchDB::as_select())
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .map(ImportBatch::from))
    }

    fn list_batches(&self, portfolio_id: &str) -> Result<Vec<ImportBatch>> {
        let mut conn = get_connection(&self.pool)?;
        Ok(import_batches::table
            .filter(import_batches::portfolio_id.eq(portfolio_id))
            .order((import_batches::imported_at.asc(), import_batches::id.asc()))
            .select(ImportBatchDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(ImportBatch::from)
            .collect())
    }

    fn first_trade_date(&self, portfolio_id: &str) -> Result<Option<NaiveDate>> {
        let mut conn = get_connection(&self.pool)?;
        let earliest: Option<String> = transactions::table
            .filter(transactions::portfolio_id.eq(portfolio_id))
            .select(min(transactions::trade_date))
            .first(&mut conn)
            .map_err(StorageError::from)?;
        earliest
            .map(|value| parse_date("trade_date", &value).into_core())
            .transpose()
    }

    async fn commit(&self, write: LedgerWrite) -> Result<()> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> { apply_write(conn, write) })
            .await
    }
}
