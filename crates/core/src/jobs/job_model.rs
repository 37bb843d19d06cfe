use chrono::{NaiveDateTime, NaiveTime};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::constants::DEFAULT_SNAPSHOT_RETENTION_DAYS;

/// When a job becomes due, relative to its last run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Due once `interval` has elapsed since the last run.
    Every(Duration),
    /// Due once per UTC day, at the first tick at or after the wall-clock time.
    DailyAfter(NaiveTime),
}

impl Schedule {
    pub fn is_due(&self, last_run: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
        match (self, last_run) {
            (Schedule::Every(_), None) => true,
            (Schedule::Every(interval), Some(last)) => {
                let elapsed = now.signed_duration_since(last);
                elapsed.to_std().map(|e| e >= *interval).unwrap_or(false)
            }
            (Schedule::DailyAfter(at), last) => {
                now.time() >= *at && last.map_or(true, |last| last.date() < now.date())
            }
        }
    }
}

/// Per-run context handed to a job. Jobs check the token between units of work.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub cancel: CancellationToken,
    pub deadline: Instant,
}

impl JobContext {
    pub fn new(cancel: CancellationToken, timeout: Duration) -> Self {
        Self {
            cancel,
            deadline: Instant::now() + timeout,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub tick: Duration,
    pub job_timeout: Duration,
    pub detection_interval: Duration,
    pub price_refresh_at: NaiveTime,
    pub snapshot_at: NaiveTime,
    pub cleanup_at: NaiveTime,
    pub snapshot_retention_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(60),
            job_timeout: Duration::from_secs(600),
            detection_interval: Duration::from_secs(24 * 60 * 60),
            price_refresh_at: NaiveTime::from_hms_opt(21, 30, 0).unwrap_or_default(),
            snapshot_at: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default(),
            cleanup_at: NaiveTime::from_hms_opt(3, 0, 0).unwrap_or_default(),
            snapshot_retention_days: DEFAULT_SNAPSHOT_RETENTION_DAYS,
        }
    }
}
