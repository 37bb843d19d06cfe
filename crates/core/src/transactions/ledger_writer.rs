//! Plans ledger writes: resolves the replay scope, replays it and hands the
//! complete write to storage.

use log::{debug, info};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::ledger_write::{LedgerWrite, ProjectionReplacement};
use super::transactions_model::Transaction;
use super::transactions_traits::TransactionRepositoryTrait;
use crate::errors::{Error, Result};
use crate::portfolio::projection::{family_transactions, symbol_family, Projection, Projector};
use crate::portfolios::Portfolio;

/// Every mutation of a ledger goes through here. Callers must hold the
/// portfolio's write lock for the duration of `apply`.
#[derive(Clone)]
pub struct LedgerWriter {
    repository: Arc<dyn TransactionRepositoryTrait>,
}

impl LedgerWriter {
    pub fn new(repository: Arc<dyn TransactionRepositoryTrait>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<dyn TransactionRepositoryTrait> {
        &self.repository
    }

    /// Replays the affected symbol families and commits the write atomically.
    /// A failed replay commits nothing.
    pub async fn apply(&self, portfolio: &Portfolio, write: LedgerWrite) -> Result<Projection> {
        let planned = self.plan(portfolio, write)?;
        let projection = planned
            .projection
            .as_ref()
            .map(|replacement| replacement.projection.clone())
            .unwrap_or_default();
        let inserted = planned.inserts.len();
        let updated = planned.updates.len();
        let deleted = planned.deletes.len();

        self.repository.commit(planned).await?;
        info!(
            "Committed ledger write for portfolio {}: {} inserted, {} updated, {} deleted",
            portfolio.id, inserted, updated, deleted
        );
        Ok(projection)
    }

    /// Dry run of `apply`.
    pub fn preview(&self, portfolio: &Portfolio, write: LedgerWrite) -> Result<Projection> {
        let planned = self.plan(portfolio, write)?;
        Ok(planned
            .projection
            .map(|replacement| replacement.projection)
            .unwrap_or_default())
    }

    fn plan(&self, portfolio: &Portfolio, mut write: LedgerWrite) -> Result<LedgerWrite> {
        let current = self.repository.list_by_portfolio(&portfolio.id)?;
        let by_id: HashMap<&str, &Transaction> =
            current.iter().map(|tx| (tx.id.as_str(), tx)).collect();

        for id in &write.deletes {
            if !by_id.contains_key(id.as_str()) {
                return Err(Error::not_found("Transaction", id.clone()));
            }
        }
        for tx in &write.updates {
            if !by_id.contains_key(tx.id.as_str()) {
                return Err(Error::not_found("Transaction", tx.id.clone()));
            }
        }
        for tx in &write.inserts {
            if by_id.contains_key(tx.id.as_str()) {
                return Err(Error::Conflict(format!(
                    "transaction {} already exists",
                    tx.id
                )));
            }
        }
        if let Some(batch_id) = write.deleted_batch_id.clone() {
            for tx in current
                .iter()
                .filter(|tx| tx.import_batch_id.as_deref() == Some(batch_id.as_str()))
            {
                if !write.deletes.contains(&tx.id) {
                    write.deletes.push(tx.id.clone());
                }
            }
        }

        let deleted: BTreeSet<&str> = write.deletes.iter().map(String::as_str).collect();
        let updates: HashMap<&str, &Transaction> =
            write.updates.iter().map(|tx| (tx.id.as_str(), tx)).collect();
        let mut ledger: Vec<Transaction> = current
            .iter()
            .filter(|tx| !deleted.contains(tx.id.as_str()))
            .map(|tx| updates.get(tx.id.as_str()).copied().unwrap_or(tx).clone())
            .collect();
        ledger.extend(write.inserts.iter().cloned());

        let mut seeds: BTreeSet<String> = BTreeSet::new();
        let mut touch = |tx: &Transaction| {
            seeds.insert(tx.symbol.clone());
            if let Some(related) = &tx.related_symbol {
                seeds.insert(related.clone());
            }
        };
        if write.full_replay {
            current.iter().chain(ledger.iter()).for_each(&mut touch);
        } else {
            current
                .iter()
                .filter(|tx| deleted.contains(tx.id.as_str()) || updates.contains_key(tx.id.as_str()))
                .for_each(&mut touch);
            write.updates.iter().for_each(&mut touch);
            write.inserts.iter().for_each(&mut touch);
        }

        let linked: Vec<Transaction> = current.iter().chain(ledger.iter()).cloned().collect();
        let family = symbol_family(&linked, seeds.iter().map(String::as_str));
        let method = write
            .portfolio_update
            .as_ref()
            .map(|p| p.cost_basis_method)
            .unwrap_or(portfolio.cost_basis_method);

        let entries = family_transactions(&ledger, &family);
        debug!(
            "Replaying {} entries across symbols {:?} for portfolio {} ({})",
            entries.len(),
            family,
            portfolio.id,
            method
        );
        let projection = Projector::new(&portfolio.id, method).project(&entries)?;

        write.projection = Some(ProjectionReplacement {
            symbols: family,
            projection,
        });
        Ok(write)
    }
}
