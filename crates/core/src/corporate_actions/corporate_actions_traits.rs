use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::corporate_actions_model::{CorporateAction, NewCorporateAction, PortfolioAction};
use crate::errors::Result;

/// Persistence for the global catalogue and the per-portfolio proposals.
///
/// Storage enforces uniqueness of the catalogue dedupe key and of non-terminal
/// proposals per (portfolio, action); violations surface as CONFLICT.
#[async_trait]
pub trait CorporateActionRepositoryTrait: Send + Sync {
    async fn insert_action(&self, action: CorporateAction) -> Result<CorporateAction>;
    fn find_by_dedupe_key(&self, dedupe_key: &str) -> Result<Option<CorporateAction>>;
    fn get_action(&self, action_id: &str) -> Result<Option<CorporateAction>>;
    /// Catalogue ordered by ex-date, optionally filtered on the applied flag.
    fn list_actions(&self, applied: Option<bool>) -> Result<Vec<CorporateAction>>;
    async fn mark_applied(&self, action_id: &str) -> Result<()>;

    async fn insert_proposal(&self, proposal: PortfolioAction) -> Result<PortfolioAction>;
    async fn update_proposal(&self, proposal: PortfolioAction) -> Result<PortfolioAction>;
    fn get_proposal(&self, proposal_id: &str) -> Result<Option<PortfolioAction>>;
    fn list_proposals(&self, portfolio_id: &str, pending_only: bool)
        -> Result<Vec<PortfolioAction>>;
    fn list_proposals_for_action(&self, action_id: &str) -> Result<Vec<PortfolioAction>>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSummary {
    pub actions_scanned: usize,
    pub proposals_created: usize,
}

/// Outcome of a synchronous detection run: the catalogue entry (new or reused)
/// and the proposals this run created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedDetection {
    pub action: CorporateAction,
    pub proposals: Vec<PortfolioAction>,
}

#[async_trait]
pub trait CorporateActionServiceTrait: Send + Sync {
    /// Adds an event to the catalogue, returning the existing entry for a duplicate.
    async fn register_action(&self, action: NewCorporateAction) -> Result<CorporateAction>;

    fn list_catalogue(&self, applied: Option<bool>) -> Result<Vec<CorporateAction>>;

    /// Proposes every non-applied catalogue entry to the portfolios it affects.
    async fn detect_all(&self, cancel: &CancellationToken) -> Result<DetectionSummary>;

    async fn detect_for_action(&self, action_id: &str) -> Result<Vec<PortfolioAction>>;

    /// Registers the event and runs detection for it synchronously. A duplicate
    /// event reuses the existing catalogue entry, which is returned either way.
    async fn simulate_detection(&self, action: NewCorporateAction)
        -> Result<SimulatedDetection>;

    fn list_proposals(
        &self,
        user_id: &str,
        portfolio_id: &str,
        pending_only: bool,
    ) -> Result<Vec<PortfolioAction>>;

    /// Approves and applies the proposal in one step. A failed application
    /// leaves the proposal APPROVED; approving it again retries.
    async fn approve(
        &self,
        user_id: &str,
        portfolio_id: &str,
        proposal_id: &str,
    ) -> Result<PortfolioAction>;

    async fn reject(
        &self,
        user_id: &str,
        portfolio_id: &str,
        proposal_id: &str,
    ) -> Result<PortfolioAction>;
}
