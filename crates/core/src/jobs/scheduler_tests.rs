use super::*;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

enum Behaviour {
    Succeed,
    Fail,
    Panic,
    Hang,
}

struct TestJob {
    name: &'static str,
    schedule: Schedule,
    behaviour: Behaviour,
    runs: AtomicUsize,
}

impl TestJob {
    fn new(name: &'static str, schedule: Schedule, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            name,
            schedule,
            behaviour,
            runs: AtomicUsize::new(0),
        })
    }

    fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Job for TestJob {
    fn name(&self) -> &'static str {
        self.name
    }

    fn schedule(&self) -> Schedule {
        self.schedule
    }

    async fn run(&self, ctx: &JobContext) -> Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Succeed => Ok(()),
            Behaviour::Fail => Err(Error::Unexpected("boom".to_string())),
            Behaviour::Panic => panic!("job exploded"),
            Behaviour::Hang => {
                ctx.cancel.cancelled().await;
                Err(Error::Cancelled("hang".to_string()))
            }
        }
    }
}

fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, day)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

#[tokio::test]
async fn test_due_jobs_run_once_per_schedule() {
    let every = TestJob::new("every", Schedule::Every(Duration::from_secs(3600)), Behaviour::Succeed);
    let daily = TestJob::new(
        "daily",
        Schedule::DailyAfter(NaiveTime::from_hms_opt(22, 0, 0).unwrap()),
        Behaviour::Succeed,
    );
    let mut scheduler = Scheduler::new(Duration::from_secs(60), Duration::from_secs(5));
    scheduler.register(every.clone());
    scheduler.register(daily.clone());
    let cancel = CancellationToken::new();

    let outcomes = scheduler.run_due(at(1, 21, 0), &cancel).await;
    assert_eq!(outcomes, vec![("every", JobOutcome::Completed)]);

    scheduler.run_due(at(1, 21, 30), &cancel).await;
    assert_eq!(every.runs(), 1);

    scheduler.run_due(at(1, 22, 5), &cancel).await;
    assert_eq!(every.runs(), 2);
    assert_eq!(daily.runs(), 1);

    scheduler.run_due(at(1, 23, 59), &cancel).await;
    assert_eq!(daily.runs(), 1);
}

#[tokio::test]
async fn test_failures_and_panics_do_not_stop_later_jobs() {
    let failing = TestJob::new("failing", Schedule::Every(Duration::from_secs(60)), Behaviour::Fail);
    let panicking = TestJob::new("panicking", Schedule::Every(Duration::from_secs(60)), Behaviour::Panic);
    let healthy = TestJob::new("healthy", Schedule::Every(Duration::from_secs(60)), Behaviour::Succeed);
    let mut scheduler = Scheduler::new(Duration::from_secs(60), Duration::from_secs(5));
    scheduler.register(failing);
    scheduler.register(panicking);
    scheduler.register(healthy.clone());

    let outcomes = scheduler.run_due(at(1, 0, 0), &CancellationToken::new()).await;
    assert!(matches!(outcomes[0].1, JobOutcome::Failed(_)));
    assert_eq!(outcomes[1].1, JobOutcome::Panicked("job exploded".to_string()));
    assert_eq!(outcomes[2].1, JobOutcome::Completed);
    assert_eq!(healthy.runs(), 1);
}

#[tokio::test]
async fn test_job_past_deadline_is_cancelled() {
    let hanging = TestJob::new("hanging", Schedule::Every(Duration::from_secs(60)), Behaviour::Hang);
    let mut scheduler = Scheduler::new(Duration::from_secs(60), Duration::from_millis(20));
    scheduler.register(hanging);

    let outcomes = scheduler.run_due(at(1, 0, 0), &CancellationToken::new()).await;
    assert_eq!(outcomes, vec![("hanging", JobOutcome::TimedOut)]);
}

#[tokio::test]
async fn test_cancelled_scheduler_runs_nothing_and_exits() {
    let job = TestJob::new("job", Schedule::Every(Duration::from_secs(60)), Behaviour::Succeed);
    let mut scheduler = Scheduler::new(Duration::from_millis(10), Duration::from_secs(5));
    scheduler.register(job.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    assert!(scheduler.run_due(at(1, 0, 0), &cancel).await.is_empty());
    scheduler.run(cancel).await;
    assert_eq!(job.runs(), 0);
}
