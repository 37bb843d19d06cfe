//! Derived portfolio rows: holdings, tax lots, realized gains and snapshots.

pub mod holdings;
pub mod snapshot;
