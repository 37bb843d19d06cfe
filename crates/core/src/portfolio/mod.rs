//! Derived portfolio state: projections, holdings, tax lots, valuation,
//! performance and daily snapshots.

pub mod holdings;
pub mod performance;
pub mod projection;
pub mod snapshot;
pub mod tax_lots;
pub mod valuation;
