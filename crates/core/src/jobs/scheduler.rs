//! Cooperative tick loop that runs due jobs one after another.

use chrono::{NaiveDateTime, Utc};
use futures::FutureExt;
use log::{debug, error, info, warn};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::job_model::JobContext;
use super::job_traits::Job;

/// How a single job run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed(String),
    TimedOut,
    Panicked(String),
}

struct ScheduledJob {
    job: Arc<dyn Job>,
    last_run: Option<NaiveDateTime>,
}

pub struct Scheduler {
    jobs: Vec<ScheduledJob>,
    tick: Duration,
    job_timeout: Duration,
}

impl Scheduler {
    pub fn new(tick: Duration, job_timeout: Duration) -> Self {
        Self {
            jobs: Vec::new(),
            tick,
            job_timeout,
        }
    }

    pub fn register(&mut self, job: Arc<dyn Job>) {
        info!("Registered job '{}' ({:?})", job.name(), job.schedule());
        self.jobs.push(ScheduledJob {
            job,
            last_run: None,
        });
    }

    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|scheduled| scheduled.job.name()).collect()
    }

    /// Ticks until `cancel` fires. Ticks missed while a job runs are skipped, never replayed.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            "Scheduler started with {} jobs, ticking every {:?}",
            self.jobs.len(),
            self.tick
        );
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.run_due(Utc::now().naive_utc(), &cancel).await;
                }
            }
        }
        info!("Scheduler stopped");
    }

    /// Runs every job due at `now`, sequentially, in registration order.
    pub async fn run_due(
        &mut self,
        now: NaiveDateTime,
        cancel: &CancellationToken,
    ) -> Vec<(&'static str, JobOutcome)> {
        let mut outcomes = Vec::new();
        for scheduled in self.jobs.iter_mut() {
            if cancel.is_cancelled() {
                break;
            }
            if !scheduled.job.schedule().is_due(scheduled.last_run, now) {
                continue;
            }
            scheduled.last_run = Some(now);
            let outcome = run_job(scheduled.job.as_ref(), cancel, self.job_timeout).await;
            outcomes.push((scheduled.job.name(), outcome));
        }
        outcomes
    }
}

async fn run_job(job: &dyn Job, cancel: &CancellationToken, timeout: Duration) -> JobOutcome {
    let ctx = JobContext::new(cancel.child_token(), timeout);
    debug!("Running job '{}'", job.name());
    let started = std::time::Instant::now();

    let run = AssertUnwindSafe(job.run(&ctx)).catch_unwind();
    let outcome = match tokio::time::timeout(timeout, run).await {
        Ok(Ok(Ok(()))) => JobOutcome::Completed,
        Ok(Ok(Err(e))) => JobOutcome::Failed(e.to_string()),
        Ok(Err(panic)) => JobOutcome::Panicked(panic_message(panic.as_ref())),
        Err(_) => {
            ctx.cancel.cancel();
            JobOutcome::TimedOut
        }
    };

    match &outcome {
        JobOutcome::Completed => info!(
            "Job '{}' completed in {:?}",
            job.name(),
            started.elapsed()
        ),
        JobOutcome::Failed(message) => error!("Job '{}' failed: {}", job.name(), message),
        JobOutcome::TimedOut => warn!("Job '{}' exceeded its {:?} deadline", job.name(), timeout),
        JobOutcome::Panicked(message) => error!("Job '{}' panicked: {}", job.name(), message),
    }
    outcome
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
