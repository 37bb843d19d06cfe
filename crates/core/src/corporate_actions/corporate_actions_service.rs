use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::action_entries::synthesize_entries;
use super::corporate_actions_model::{
    CorporateAction, NewCorporateAction, PortfolioAction, ProposalStatus,
};
use super::corporate_actions_traits::{
    CorporateActionRepositoryTrait, CorporateActionServiceTrait, DetectionSummary,
    SimulatedDetection,
};
use super::proposal_state::{transition, ProposalEvent};
use crate::errors::{Error, ErrorKind, Result};
use crate::portfolio::holdings::HoldingRepositoryTrait;
use crate::portfolio::projection::{family_transactions, symbol_family, Projector};
use crate::portfolios::{Portfolio, PortfolioAccess};
use crate::transactions::{LedgerWrite, LedgerWriter, TransactionRepositoryTrait};
use crate::utils::decimal_utils::is_quantity_significant;

pub struct CorporateActionService {
    access: PortfolioAccess,
    repository: Arc<dyn CorporateActionRepositoryTrait>,
    holdings: Arc<dyn HoldingRepositoryTrait>,
    transactions: Arc<dyn TransactionRepositoryTrait>,
    writer: LedgerWriter,
}

impl CorporateActionService {
    pub fn new(
        access: PortfolioAccess,
        repository: Arc<dyn CorporateActionRepositoryTrait>,
        holdings: Arc<dyn HoldingRepositoryTrait>,
        transactions: Arc<dyn TransactionRepositoryTrait>,
    ) -> Self {
        let writer = LedgerWriter::new(transactions.clone());
        Self {
            access,
            repository,
            holdings,
            transactions,
            writer,
        }
    }

    /// Shares of the action's symbol held at the ex-date, from a replay of the
    /// symbol's family.
    fn shares_at_ex_date(&self, portfolio: &Portfolio, action: &CorporateAction) -> Result<Decimal> {
        let ledger = self.transactions.list_by_portfolio(&portfolio.id)?;
        let family = symbol_family(&ledger, [action.symbol.as_str()]);
        let entries = family_transactions(&ledger, &family);
        let state = Projector::new(&portfolio.id, portfolio.cost_basis_method)
            .project_as_of(&entries, action.ex_date)?;
        Ok(state.quantity_of(&action.symbol))
    }

    async fn detect(
        &self,
        action: &CorporateAction,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<PortfolioAction>> {
        let existing = self.repository.list_proposals_for_action(&action.id)?;
        let mut created = Vec::new();

        for portfolio_id in self.holdings.list_lot_holders(&action.symbol)? {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(Error::Cancelled(format!(
                    "detection of {} stopped before portfolio {}",
                    action.id, portfolio_id
                )));
            }
            // Any existing proposal, terminal or not, blocks a new one: a rejected
            // proposal is the owner's decision and an applied one must not repeat.
            if existing.iter().any(|p| p.portfolio_id == portfolio_id) {
                continue;
            }
            let Some(portfolio) = self.access.repository().get_by_id(&portfolio_id)? else {
                continue;
            };

            let _guard = self.access.lock(&portfolio_id).await;
            let shares = self.shares_at_ex_date(&portfolio, action)?;
            if !is_quantity_significant(&shares) {
                continue;
            }

            let proposal = PortfolioAction::pending(
                &portfolio_id,
                action,
                shares,
                Utc::now().naive_utc(),
            );
            match self.repository.insert_proposal(proposal).await {
                Ok(inserted) => {
                    debug!("Proposed {} to portfolio {}", action.id, portfolio_id);
                    created.push(inserted);
                }
                Err(e) if e.kind() == ErrorKind::Conflict => {
                    debug!(
                        "Proposal for {} already open in portfolio {}",
                        action.id, portfolio_id
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(created)
    }

    fn owned_proposal(&self, portfolio_id: &str, proposal_id: &str) -> Result<PortfolioAction> {
        self.repository
            .get_proposal(proposal_id)?
            .filter(|p| p.portfolio_id == portfolio_id)
            .ok_or_else(|| Error::not_found("PortfolioAction", proposal_id))
    }

    fn action(&self, action_id: &str) -> Result<CorporateAction> {
        self.repository
            .get_action(action_id)?
            .ok_or_else(|| Error::not_found("CorporateAction", action_id))
    }

    /// Marks the catalogue entry applied once every proposal for it is terminal.
    async fn settle_catalogue(&self, action_id: &str) -> Result<()> {
        let open = self
            .repository
            .list_proposals_for_action(action_id)?
            .iter()
            .any(|p| !p.status.is_terminal());
        if !open {
            self.repository.mark_applied(action_id).await?;
            debug!("Corporate action {} settled in every portfolio", action_id);
        }
        Ok(())
    }
}

#[async_trait]
impl CorporateActionServiceTrait for CorporateActionService {
    async fn register_action(&self, action: NewCorporateAction) -> Result<CorporateAction> {
        action.validate()?;
        let action = action.normalized();
        let key = action.dedupe_key();
        if let Some(existing) = self.repository.find_by_dedupe_key(&key)? {
            return Ok(existing);
        }

        match self
            .repository
            .insert_action(action.into_action(Utc::now().naive_utc()))
            .await
        {
            Ok(inserted) => {
                info!("Registered corporate action {}", key);
                Ok(inserted)
            }
            Err(e) if e.kind() == ErrorKind::Conflict => self
                .repository
                .find_by_dedupe_key(&key)?
                .ok_or(e),
            Err(e) => Err(e),
        }
    }

    fn list_catalogue(&self, applied: Option<bool>) -> Result<Vec<CorporateAction>> {
        self.repository.list_actions(applied)
    }

    async fn detect_all(&self, cancel: &CancellationToken) -> Result<DetectionSummary> {
        let mut summary = DetectionSummary::default();
        for action in self.repository.list_actions(Some(false))? {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled(format!(
                    "detection stopped after {} actions",
                    summary.actions_scanned
                )));
            }
            let created = self.detect(&action, Some(cancel)).await?;
            summary.actions_scanned += 1;
            summary.proposals_created += created.len();
        }
        info!(
            "Detection scanned {} actions and created {} proposals",
            summary.actions_scanned, summary.proposals_created
        );
        Ok(summary)
    }

    async fn detect_for_action(&self, action_id: &str) -> Result<Vec<PortfolioAction>> {
        let action = self.action(action_id)?;
        self.detect(&action, None).await
    }

    async fn simulate_detection(
        &self,
        action: NewCorporateAction,
    ) -> Result<SimulatedDetection> {
        let registered = self.register_action(action).await?;
        let proposals = self.detect(&registered, None).await?;
        Ok(SimulatedDetection {
            action: registered,
            proposals,
        })
    }

    fn list_proposals(
        &self,
        user_id: &str,
        portfolio_id: &str,
        pending_only: bool,
    ) -> Result<Vec<PortfolioAction>> {
        self.access.authorize(user_id, portfolio_id)?;
        self.repository.list_proposals(portfolio_id, pending_only)
    }

    async fn approve(
        &self,
        user_id: &str,
        portfolio_id: &str,
        proposal_id: &str,
    ) -> Result<PortfolioAction> {
        let (portfolio, _guard) = self.access.authorize_for_write(user_id, portfolio_id).await?;
        let proposal = self.owned_proposal(portfolio_id, proposal_id)?;

        let approved = if proposal.status == ProposalStatus::Approved {
            proposal
        } else {
            let next = transition(&proposal, ProposalEvent::Approve, Utc::now().naive_utc())?;
            self.repository.update_proposal(next).await?
        };

        let action = self.action(&approved.corporate_action_id)?;
        let now = Utc::now().naive_utc();
        let shares = self.shares_at_ex_date(&portfolio, &action)?;
        if !is_quantity_significant(&shares) {
            return Err(Error::Conflict(format!(
                "portfolio {} no longer holds {} at {}",
                portfolio_id, action.symbol, action.ex_date
            )));
        }
        let entries = synthesize_entries(
            &action,
            portfolio_id,
            &portfolio.base_currency,
            shares,
            now,
        )?;
        let applied = transition(&approved, ProposalEvent::Apply, now)?;

        let write = LedgerWrite::new(portfolio_id)
            .insert_all(entries)
            .with_proposal_update(applied.clone());
        if let Err(e) = self.writer.apply(&portfolio, write).await {
            warn!(
                "Applying proposal {} to portfolio {} failed; it stays APPROVED: {}",
                proposal_id, portfolio_id, e
            );
            return Err(e);
        }
        info!(
            "Applied corporate action {} to portfolio {}",
            action.id, portfolio_id
        );

        self.settle_catalogue(&action.id).await?;
        Ok(applied)
    }

    async fn reject(
        &self,
        user_id: &str,
        portfolio_id: &str,
        proposal_id: &str,
    ) -> Result<PortfolioAction> {
        let (_portfolio, _guard) = self.access.authorize_for_write(user_id, portfolio_id).await?;
        let proposal = self.owned_proposal(portfolio_id, proposal_id)?;
        let rejected = transition(&proposal, ProposalEvent::Reject, Utc::now().naive_utc())?;
        let rejected = self.repository.update_proposal(rejected).await?;
        self.settle_catalogue(&rejected.corporate_action_id).await?;
        Ok(rejected)
    }
}
