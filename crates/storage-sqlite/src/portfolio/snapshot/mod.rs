//! SQLite storage implementation for daily performance snapshots.

mod model;
mod repository;

pub use model::PerformanceSnapshotDB;
pub use repository::SnapshotRepository;

// Re-export trait from core for convenience
pub use folioledger_core::portfolio::snapshot::SnapshotRepositoryTrait;
