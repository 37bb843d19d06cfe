mod config;
mod main_lib;
mod scheduler;

use config::Config;
use main_lib::{build_state, init_tracing};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);
    let state = build_state(&config).await?;

    let cancel = CancellationToken::new();
    let scheduler = scheduler::start_job_scheduler(state, &config.scheduler, cancel.clone());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    cancel.cancel();
    scheduler.await?;
    Ok(())
}
