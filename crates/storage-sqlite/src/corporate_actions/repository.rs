use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use std::sync::Arc;

use folioledger_core::corporate_actions::{
    CorporateAction, CorporateActionRepositoryTrait, PortfolioAction, ProposalStatus,
};
use folioledger_core::errors::Error;
use folioledger_core::Result;

use super::model::{CorporateActionDB, PortfolioActionDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::{corporate_actions, portfolio_actions};

pub struct CorporateActionRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl CorporateActionRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        CorporateActionRepository { pool, writer }
    }

    fn to_actions(rows: Vec<CorporateActionDB>) -> Result<Vec<CorporateAction>> {
        rows.into_iter()
            .map(|row| CorporateAction::try_from(row).into_core())
            .collect()
    }

    fn to_proposals(rows: Vec<PortfolioActionDB>) -> Result<Vec<PortfolioAction>> {
        rows.into_iter()
            .map(|row| PortfolioAction::try_from(row).into_core())
            .collect()
    }
}

/// Overwrites a proposal row. Shared with the ledger commit, which moves a
/// proposal to APPLIED in the same transaction as the synthesized entries.
pub fn update_proposal_row(
    conn: &mut SqliteConnection,
    proposal: PortfolioAction,
) -> Result<PortfolioAction> {
    let proposal_id = proposal.id.clone();
    let row = PortfolioActionDB::from(proposal);
    let updated = diesel::update(portfolio_actions::table.find(&proposal_id))
        .set(&row)
        .returning(PortfolioActionDB::as_returning())
        .get_result(conn)
        .optional()
        .map_err(StorageError::from)?
        .ok_or_else(|| Error::not_found("PortfolioAction", proposal_id))?;
    Ok(PortfolioAction::try_from(updated)?)
}

#[async_trait]
impl CorporateActionRepositoryTrait for CorporateActionRepository {
    async fn insert_action(&self, action: CorporateAction) -> Result<CorporateAction> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<CorporateAction> {
                let inserted = diesel::insert_into(corporate_actions::table)
                    .values(CorporateActionDB::from(action))
                    .returning(CorporateActionDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok(CorporateAction::try_from(inserted)?)
            })
            .await
    }

    fn find_by_dedupe_key(&self, dedupe_key: &str) -> Result<Option<CorporateAction>> {
        let mut conn = get_connection(&self.pool)?;
        corporate_actions::table
            .filter(corporate_actions::dedupe_key.eq(dedupe_key))
            .select(CorporateActionDB::as_select())
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .map(|row| CorporateAction::try_from(row).into_core())
            .transpose()
    }

    fn get_action(&self, action_id: &str) -> Result<Option<CorporateAction>> {
        let mut conn = get_connection(&self.pool)?;
        corporate_actions::table
            .find(action_id)
            .select(CorporateActionDB::as_select())
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .map(|row| CorporateAction::try_from(row).into_core())
            .transpose()
    }

    fn list_actions(&self, applied: Option<bool>) -> Result<Vec<CorporateAction>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = corporate_actions::table.into_boxed();
        if let Some(flag) = applied {
            query = query.filter(corporate_actions::applied.eq(flag));
        }
        let rows = query
            .order((corporate_actions::ex_date.asc(), corporate_actions::created_at.asc()))
            .select(CorporateActionDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?;
        Self::to_actions(rows)
    }

    async fn mark_applied(&self, action_id: &str) -> Result<()> {
        let target = action_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                let affected = diesel::update(corporate_actions::table.find(&target))
                    .set(corporate_actions::applied.eq(true))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                if affected == 0 {
                    return Err(Error::not_found("CorporateAction", target));
                }
                Ok(())
            })
            .await
    }

    async fn insert_proposal(&self, proposal: PortfolioAction) -> Result<PortfolioAction> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<PortfolioAction> {
                let inserted = diesel::insert_into(portfolio_actions::table)
                    .values(PortfolioActionDB::from(proposal))
                    .returning(PortfolioActionDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok(PortfolioAction::try_from(inserted)?)
            })
            .await
    }

    async fn update_proposal(&self, proposal: PortfolioAction) -> Result<PortfolioAction> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<PortfolioAction> {
                update_proposal_row(conn, proposal)
            })
            .await
    }

    fn get_proposal(&self, proposal_id: &str) -> Result<Option<PortfolioAction>> {
        let mut conn = get_connection(&self.pool)?;
        portfolio_actions::table
            .find(proposal_id)
            .select(PortfolioActionDB::as_select())
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .map(|row| PortfolioAction::try_from(row).into_core())
            .transpose()
    }

    fn list_proposals(
        &self,
        portfolio_id: &str,
        pending_only: bool,
    ) -> Result<Vec<PortfolioAction>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = portfolio_actions::table
            .filter(portfolio_actions::portfolio_id.eq(portfolio_id))
            .into_boxed();
        if pending_only {
            query = query.filter(portfolio_actions::status.eq(ProposalStatus::Pending.as_str()));
        }
        let rows = query
            .order((portfolio_actions::detected_at.asc(), portfolio_actions::id.asc()))
            .select(PortfolioActionDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?;
        Self::to_proposals(rows)
    }

    fn list_proposals_for_action(&self, action_id: &str) -> Result<Vec<PortfolioAction>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = portfolio_actions::table
            .filter(portfolio_actions::corporate_action_id.eq(action_id))
            .order((portfolio_actions::detected_at.asc(), portfolio_actions::id.asc()))
            .select(PortfolioActionDB::as_select())
            .load(&mut conn)
            .map_err(StorageError::from)?;
        Self::to_proposals(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, d, test_db};
    use crate::transactions::TransactionRepository;
    use folioledger_core::corporate_actions::{CorporateActionKind, NewCorporateAction};
    use folioledger_core::errors::ErrorKind;
    use folioledger_core::transactions::{LedgerWrite, TransactionRepositoryTrait};
    use rust_decimal_macros::dec;

    fn split(symbol: &str) -> CorporateAction {
        NewCorporateAction {
            symbol: symbol.to_string(),
            ex_date: d(2024, 6, 10),
            kind: CorporateActionKind::Split { ratio: dec!(4) },
        }
        .normalized()
        .into_action(at(d(2024, 6, 1), 8))
    }

    #[tokio::test]
    async fn test_catalogue_dedupes_and_round_trips_payload() {
        let db = test_db();
        let repo = CorporateActionRepository::new(db.pool.clone(), db.writer.clone());

        let spinoff = NewCorporateAction {
            symbol: "ACME".to_string(),
            ex_date: d(2024, 5, 1),
            kind: CorporateActionKind::Spinoff {
                ratio: dec!(0.5),
                new_symbol: "NEWCO".to_string(),
                basis_fraction: Some(dec!(0.2)),
            },
        }
        .into_action(at(d(2024, 4, 1), 8));
        let stored = repo.insert_action(spinoff.clone()).await.unwrap();
        assert_eq!(stored, spinoff);

        let nvda = repo.insert_action(split("NVDA")).await.unwrap();
        let err = repo.insert_action(split("NVDA")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let found = repo.find_by_dedupe_key(&nvda.dedupe_key()).unwrap().unwrap();
        assert_eq!(found.id, nvda.id);

        repo.mark_applied(&spinoff.id).await.unwrap();
        let open: Vec<String> = repo
            .list_actions(Some(false))
            .unwrap()
            .into_iter()
            .map(|a| a.symbol)
            .collect();
        assert_eq!(open, vec!["NVDA".to_string()]);
        assert_eq!(repo.list_actions(None).unwrap()[0].symbol, "ACME");

        let err = repo.mark_applied("nope").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_one_open_proposal_per_portfolio_and_action() {
        let db = test_db();
        db.portfolio("u1", "p1").await;
        let repo = CorporateActionRepository::new(db.pool.clone(), db.writer.clone());
        let action = repo.insert_action(split("NVDA")).await.unwrap();

        let pending = PortfolioAction::pending("p1", &action, dec!(10), at(d(2024, 6, 2), 1));
        repo.insert_proposal(pending.clone()).await.unwrap();
        let duplicate = PortfolioAction::pending("p1", &action, dec!(10), at(d(2024, 6, 2), 2));
        let err = repo.insert_proposal(duplicate.clone()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let mut rejected = pending.clone();
        rejected.status = ProposalStatus::Rejected;
        rejected.reviewed_at = Some(at(d(2024, 6, 3), 1));
        repo.update_proposal(rejected).await.unwrap();

        // A terminal proposal no longer blocks a new one.
        repo.insert_proposal(duplicate.clone()).await.unwrap();
        assert_eq!(repo.list_proposals("p1", true).unwrap().len(), 1);
        assert_eq!(repo.list_proposals("p1", false).unwrap().len(), 2);
        assert_eq!(repo.list_proposals_for_action(&action.id).unwrap().len(), 2);

        let mut applied = duplicate.clone();
        applied.status = ProposalStatus::Applied;
        applied.applied_at = Some(at(d(2024, 6, 10), 1));
        TransactionRepository::new(db.pool.clone(), db.writer.clone())
            .commit(LedgerWrite::new("p1").with_proposal_update(applied))
            .await
            .unwrap();
        let stored = repo.get_proposal(&duplicate.id).unwrap().unwrap();
        assert_eq!(stored.status, ProposalStatus::Applied);
        assert!(stored.applied_at.is_some());

        let mut ghost = pending;
        ghost.id = "ghost".to_string();
        let err = repo.update_proposal(ghost).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
