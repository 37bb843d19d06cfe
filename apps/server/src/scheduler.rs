//! Background job scheduler for the daemon.
//!
//! Runs detection, price refresh, snapshots and cleanup until shutdown is requested.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use folioledger_core::jobs::SchedulerConfig;

use crate::main_lib::{build_scheduler, AppState};

/// Starts the background scheduler. Cancelling `cancel` stops it after the
/// in-flight job observes the token.
pub fn start_job_scheduler(
    state: Arc<AppState>,
    config: &SchedulerConfig,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let scheduler = build_scheduler(&state, config);
    info!(
        "Job scheduler starting: {}",
        scheduler.job_names().join(", ")
    );
    tokio::spawn(async move {
        scheduler.run(cancel).await;
        info!("Job scheduler stopped");
    })
}
