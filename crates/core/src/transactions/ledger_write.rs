//! A single atomic change to a portfolio's ledger and its derived rows.

use std::collections::BTreeSet;

use super::transactions_model::{ImportBatch, Transaction};
use crate::corporate_actions::PortfolioAction;
use crate::portfolio::projection::Projection;
use crate::portfolios::Portfolio;

/// Replacement rows for every symbol of the replayed families.
///
/// Storage deletes the holdings, lots and realized gains of `symbols` and inserts
/// `projection` in the same database transaction as the ledger rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionReplacement {
    pub symbols: BTreeSet<String>,
    pub projection: Projection,
}

/// Everything one write job commits, in one transaction.
///
/// Built by services, completed by [`super::LedgerWriter`] with the replayed
/// projection, then handed to the repository's `commit`.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerWrite {
    pub portfolio_id: String,
    pub portfolio_update: Option<Portfolio>,
    pub new_batch: Option<ImportBatch>,
    pub deleted_batch_id: Option<String>,
    pub inserts: Vec<Transaction>,
    pub updates: Vec<Transaction>,
    pub deletes: Vec<String>,
    pub proposal_update: Option<PortfolioAction>,
    pub full_replay: bool,
    pub projection: Option<ProjectionReplacement>,
}

impl LedgerWrite {
    pub fn new(portfolio_id: impl Into<String>) -> Self {
        Self {
            portfolio_id: portfolio_id.into(),
            portfolio_update: None,
            new_batch: None,
            deleted_batch_id: None,
            inserts: Vec::new(),
            updates: Vec::new(),
            deletes: Vec::new(),
            proposal_update: None,
            full_replay: false,
            projection: None,
        }
    }

    pub fn insert(mut self, transaction: Transaction) -> Self {
        self.inserts.push(transaction);
        self
    }

    pub fn insert_all(mut self, transactions: impl IntoIterator<Item = Transaction>) -> Self {
        self.inserts.extend(transactions);
        self
    }

    pub fn update(mut self, transaction: Transaction) -> Self {
        self.updates.push(transaction);
        self
    }

    pub fn delete(mut self, transaction_id: impl Into<String>) -> Self {
        self.deletes.push(transaction_id.into());
        self
    }

    pub fn with_batch(mut self, batch: ImportBatch) -> Self {
        self.new_batch = Some(batch);
        self
    }

    /// Removes the batch row and every entry that references it.
    pub fn delete_batch(mut self, batch_id: impl Into<String>) -> Self {
        self.deleted_batch_id = Some(batch_id.into());
        self
    }

    /// Persists the portfolio row and replays with its cost-basis method.
    pub fn with_portfolio_update(mut self, portfolio: Portfolio) -> Self {
        self.portfolio_update = Some(portfolio);
        self.full_replay = true;
        self
    }

    pub fn with_proposal_update(mut self, proposal: PortfolioAction) -> Self {
        self.proposal_update = Some(proposal);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.portfolio_update.is_none()
            && self.new_batch.is_none()
            && self.deleted_batch_id.is_none()
            && self.inserts.is_empty()
            && self.updates.is_empty()
            && self.deletes.is_empty()
            && self.proposal_update.is_none()
    }
}
