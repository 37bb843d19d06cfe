//! Corporate actions module - the global catalogue, per-portfolio proposals,
//! their review state machine and application through the ledger.

mod action_entries;
mod corporate_actions_model;
mod corporate_actions_service;
mod corporate_actions_traits;
mod proposal_state;

pub use action_entries::synthesize_entries;
pub use corporate_actions_model::{
    dedupe_key, describe, CorporateAction, CorporateActionKind, CorporateActionParts,
    NewCorporateAction, PortfolioAction, ProposalStatus,
};
pub use corporate_actions_service::CorporateActionService;
pub use corporate_actions_traits::{
    CorporateActionRepositoryTrait, CorporateActionServiceTrait, DetectionSummary,
    SimulatedDetection,
};
pub use proposal_state::{next_status, transition, ProposalEvent};
