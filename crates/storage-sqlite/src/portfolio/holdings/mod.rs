//! SQLite storage for the derived projection: holdings, tax lots and realized gains.

mod model;
mod repository;

pub use model::{HoldingDB, RealizedGainDB, TaxLotDB};
pub use repository::{replace_projection, HoldingRepository};

// Re-export trait from core for convenience
pub use folioledger_core::portfolio::holdings::HoldingRepositoryTrait;
