//! Jobs module - scheduled background work.

mod job_model;
mod job_traits;
mod scheduler;
mod standard_jobs;

pub use job_model::{JobContext, Schedule, SchedulerConfig};
pub use job_traits::Job;
pub use scheduler::{JobOutcome, Scheduler};
pub use standard_jobs::{CleanupJob, CorporateActionDetectionJob, PriceRefreshJob, SnapshotJob};

#[cfg(test)]
mod scheduler_tests;
