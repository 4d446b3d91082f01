//! Per-job cron timers
//!
//! Each scheduled job owns one tokio task that sleeps until its next fire
//! time and then spawns a run of a fresh copy of the job. A job with a bad
//! cron expression is reported and skipped; the others are unaffected.

use super::schedule::{CronSchedule, Schedule};
use crate::config::CronTimezone;
use crate::core::pipeline::JobExecutor;
use crate::core::runs::RunLog;
use crate::domain::JobSpec;
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// What `start` did with each job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    /// Keys of jobs with a running timer
    pub scheduled: Vec<String>,

    /// Jobs whose cron expression was rejected, with the reason
    pub skipped: Vec<(String, String)>,

    /// Jobs without a cron expression (run on demand only)
    pub on_demand: Vec<String>,
}

/// Owner of the timer tasks
pub struct Scheduler {
    executor: Arc<dyn JobExecutor>,
    timezone: CronTimezone,
    timers: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(executor: Arc<dyn JobExecutor>) -> Self {
        Self {
            executor,
            timezone: CronTimezone::default(),
            timers: Vec::new(),
        }
    }

    /// Clock cron expressions are evaluated against
    pub fn with_timezone(mut self, timezone: CronTimezone) -> Self {
        self.timezone = timezone;
        self
    }

    /// Starts one timer per job that has a valid cron expression
    ///
    /// Timers stop when `shutdown` flips to `true`; runs already in flight
    /// are left to finish.
    pub fn start(&mut self, jobs: Vec<JobSpec>, shutdown: watch::Receiver<bool>) -> ScheduleReport {
        let mut report = ScheduleReport::default();

        for job in jobs {
            let Some(expression) = job.cron.as_deref().filter(|c| !c.trim().is_empty()) else {
                tracing::debug!(job_key = %job.key, "Job has no cron expression, not scheduled");
                report.on_demand.push(job.key.clone());
                continue;
            };

            match CronSchedule::parse(expression).map(|s| s.in_timezone(self.timezone)) {
                Ok(schedule) => {
                    tracing::info!(job_key = %job.key, cron = %expression, timezone = ?self.timezone, "Job scheduled");
                    report.scheduled.push(job.key.clone());
                    let handle = tokio::spawn(run_timer(
                        job,
                        Box::new(schedule),
                        self.executor.clone(),
                        shutdown.clone(),
                    ));
                    self.timers.push(handle);
                }
                Err(e) => {
                    tracing::error!(job_key = %job.key, cron = %expression, error = %e, "Job not scheduled");
                    report.skipped.push((job.key.clone(), e.to_string()));
                }
            }
        }

        report
    }

    /// Number of running timers
    pub fn timer_count(&self) -> usize {
        self.timers.iter().filter(|t| !t.is_finished()).count()
    }

    /// Waits for every timer to stop
    pub async fn join(self) {
        for outcome in join_all(self.timers).await {
            if let Err(e) = outcome {
                tracing::warn!(error = %e, "Scheduler timer task ended abnormally");
            }
        }
    }
}

async fn run_timer(
    job: JobSpec,
    schedule: Box<dyn Schedule>,
    executor: Arc<dyn JobExecutor>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        let now = Utc::now();
        let Some(next) = schedule.next_after(now) else {
            tracing::info!(job_key = %job.key, "Cron expression has no further fire times");
            break;
        };
        let wait = (next - now).to_std().unwrap_or_default();
        tracing::debug!(job_key = %job.key, next_run = %next, "Waiting for next fire time");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                let executor = executor.clone();
                let job = job.clone();
                tokio::spawn(async move {
                    executor.execute(job, RunLog::new()).await;
                });
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    tracing::debug!(job_key = %job.key, "Scheduler timer stopped");
}
