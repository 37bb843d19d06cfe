//! Snapshot module - immutable daily performance rollups.

mod snapshot_model;
mod snapshot_service;
mod snapshot_traits;

pub use snapshot_model::PerformanceSnapshot;
pub use snapshot_service::SnapshotService;
pub use snapshot_traits::{SnapshotRepositoryTrait, SnapshotServiceTrait};
