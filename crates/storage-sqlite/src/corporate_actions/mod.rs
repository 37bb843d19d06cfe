//! SQLite storage implementation for the corporate-action catalogue and proposals.

mod model;
mod repository;

pub use model::{CorporateActionDB, PortfolioActionDB};
pub use repository::{update_proposal_row, CorporateActionRepository};

// Re-export trait from core for convenience
pub use folioledger_core::corporate_actions::CorporateActionRepositoryTrait;
