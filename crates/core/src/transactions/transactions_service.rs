use async_trait::async_trait;
use chrono::{Duration, Utc};
use log::{debug, info, warn};
use std::sync::Arc;

use super::ledger_write::LedgerWrite;
use super::ledger_writer::LedgerWriter;
use super::transactions_import::{ImportRequest, ImportResult, ImportRowError};
use super::transactions_model::{
    ImportBatch, NewTransaction, Transaction, TransactionQuery, TransactionUpdate,
};
use super::transactions_traits::{TransactionRepositoryTrait, TransactionServiceTrait};
use crate::errors::{Error, Result, ValidationError};
use crate::portfolios::PortfolioAccess;

/// Ledger operations scoped by portfolio owner.
pub struct TransactionService {
    access: PortfolioAccess,
    repository: Arc<dyn TransactionRepositoryTrait>,
    writer: LedgerWriter,
}

impl TransactionService {
    pub fn new(access: PortfolioAccess, repository: Arc<dyn TransactionRepositoryTrait>) -> Self {
        let writer = LedgerWriter::new(repository.clone());
        Self {
            access,
            repository,
            writer,
        }
    }

    fn existing(&self, portfolio_id: &str, transaction_id: &str) -> Result<Transaction> {
        self.repository
            .get_by_id(portfolio_id, transaction_id)?
            .ok_or_else(|| Error::not_found("Transaction", transaction_id))
    }

    fn ensure_user_entry(transaction: &Transaction) -> Result<()> {
        if transaction.is_synthesized() {
            return Err(Error::Conflict(format!(
                "transaction {} was produced by a corporate action and cannot be changed",
                transaction.id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionServiceTrait for TransactionService {
    async fn append(&self, user_id: &str, transaction: NewTransaction) -> Result<Transaction> {
        let (portfolio, _guard) = self
            .access
            .authorize_for_write(user_id, &transaction.portfolio_id)
            .await?;
        if transaction.corporate_action_id.is_some() {
            return Err(Error::Validation(ValidationError::field(
                "corporateActionId",
                "only approved corporate actions may set this field",
            )));
        }
        if let Some(batch_id) = transaction.import_batch_id.as_deref() {
            if self.repository.get_batch(&portfolio.id, batch_id)?.is_none() {
                return Err(Error::not_found("ImportBatch", batch_id));
            }
        }
        transaction.validate()?;

        let created = transaction.into_transaction(Utc::now().naive_utc());
        self.writer
            .apply(&portfolio, LedgerWrite::new(&portfolio.id).insert(created.clone()))
            .await?;
        debug!(
            "Appended {} {} {} to portfolio {}",
            created.transaction_type, created.quantity, created.symbol, portfolio.id
        );
        Ok(created)
    }

    async fn edit(
        &self,
        user_id: &str,
        portfolio_id: &str,
        transaction_id: &str,
        update: TransactionUpdate,
    ) -> Result<Transaction> {
        let (portfolio, _guard) = self.access.authorize_for_write(user_id, portfolio_id).await?;
        let current = self.existing(portfolio_id, transaction_id)?;
        Self::ensure_user_entry(&current)?;

        let updated = update.apply_to(&current, Utc::now().naive_utc())?;
        self.writer
            .apply(&portfolio, LedgerWrite::new(portfolio_id).update(updated.clone()))
            .await?;
        Ok(updated)
    }

    async fn delete(&self, user_id: &str, portfolio_id: &str, transaction_id: &str) -> Result<()> {
        let (portfolio, _guard) = self.access.authorize_for_write(user_id, portfolio_id).await?;
        let current = self.existing(portfolio_id, transaction_id)?;
        Self::ensure_user_entry(&current)?;

        self.writer
            .apply(&portfolio, LedgerWrite::new(portfolio_id).delete(current.id))
            .await?;
        Ok(())
    }

    async fn delete_batch(
        &self,
        user_id: &str,
        portfolio_id: &str,
        batch_id: &str,
    ) -> Result<usize> {
        let (portfolio, _guard) = self.access.authorize_for_write(user_id, portfolio_id).await?;
        if self.repository.get_batch(portfolio_id, batch_id)?.is_none() {
            return Err(Error::not_found("ImportBatch", batch_id));
        }
        let removed = self
            .repository
            .list_by_portfolio(portfolio_id)?
            .iter()
            .filter(|tx| tx.import_batch_id.as_deref() == Some(batch_id))
            .count();

        self.writer
            .apply(&portfolio, LedgerWrite::new(portfolio_id).delete_batch(batch_id))
            .await?;
        info!(
            "Deleted import batch {} ({} entries) from portfolio {}",
            batch_id, removed, portfolio_id
        );
        Ok(removed)
    }

    fn query(&self, user_id: &str, query: &TransactionQuery) -> Result<Vec<Transaction>> {
        self.access.authorize(user_id, &query.portfolio_id)?;
        query.validate()?;
        self.repository.list(query)
    }

    fn list_batches(&self, user_id: &str, portfolio_id: &str) -> Result<Vec<ImportBatch>> {
        self.access.authorize(user_id, portfolio_id)?;
        self.repository.list_batches(portfolio_id)
    }

    async fn import_transactions(
        &self,
        user_id: &str,
        portfolio_id: &str,
        request: ImportRequest,
    ) -> Result<ImportResult> {
        let (portfolio, _guard) = self.access.authorize_for_write(user_id, portfolio_id).await?;
        if request.format_tag.trim().is_empty() {
            return Err(Error::Validation(ValidationError::field(
                "formatTag",
                "format tag is required",
            )));
        }

        let now = Utc::now().naive_utc();
        let batch_id = uuid::Uuid::new_v4().to_string();
        let mut errors: Vec<ImportRowError> = request.parse_errors.clone();
        let mut valid: Vec<Transaction> = Vec::new();

        // Strictly increasing created_at keeps file order as the same-day tiebreak.
        for (i, record) in request.records.iter().enumerate() {
            let created_at = now + Duration::microseconds(i as i64);
            match record.to_transaction(portfolio_id, &batch_id, created_at) {
                Ok(transaction) => valid.push(transaction),
                Err(row_error) => {
                    warn!(
                        "Import row {} rejected ({}): {}",
                        row_error.line, row_error.field, row_error.message
                    );
                    errors.push(row_error);
                }
            }
        }
        errors.sort_by_key(|e| e.line);

        let mut result = ImportResult {
            batch_id: None,
            total: request.records.len() + request.parse_errors.len(),
            success: 0,
            failed: 0,
            skipped: 0,
            errors,
            dry_run: request.dry_run,
        };

        if !result.errors.is_empty() && !request.skip_invalid {
            result.failed = result.errors.len();
            return Ok(result);
        }
        result.skipped = result.errors.len();
        if valid.is_empty() {
            return Ok(result);
        }

        let success = valid.len();
        let write = LedgerWrite::new(portfolio_id)
            .with_batch(ImportBatch {
                id: batch_id.clone(),
                portfolio_id: portfolio_id.to_string(),
                format_tag: request.format_tag.trim().to_string(),
                imported_at: now,
                notes: request.notes.clone(),
            })
            .insert_all(valid);

        if request.dry_run {
            self.writer.preview(&portfolio, write)?;
        } else {
            self.writer.apply(&portfolio, write).await?;
            info!(
                "Imported {} entries into portfolio {} as batch {}",
                success, portfolio_id, batch_id
            );
            result.batch_id = Some(batch_id);
        }
        result.success = success;
        Ok(result)
    }
}
