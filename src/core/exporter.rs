//! Exporter facade - the trigger surface
//!
//! Wires configuration, transport, token provider and extensions into a
//! [`JobRunner`], and exposes what a control plane needs: list jobs, run
//! jobs now, trigger a background batch and poll its output, or start the
//! cron scheduler.

use crate::adapters::api::{ApiTransport, HttpTransport};
use crate::auth::TokenProvider;
use crate::config::ExporterConfig;
use crate::core::extensions::ExtensionRegistry;
use crate::core::pipeline::{JobExecutor, JobRunner, RunResult};
use crate::core::runs::{RunLog, RunPoll, RunRegistry};
use crate::core::scheduler::{ScheduleReport, Scheduler};
use crate::core::stages::{ExportStage, RequestStage};
use crate::domain::{JobSpec, Result, RunId};
use futures::future::join_all;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// One configured job as shown by `list-jobs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobListing {
    pub key: String,
    pub name: String,
    pub cron: Option<String>,
}

impl JobListing {
    pub fn from_spec(job: &JobSpec) -> Self {
        Self {
            key: job.key.clone(),
            name: job.display_name().to_string(),
            cron: job.cron.clone().filter(|c| !c.trim().is_empty()),
        }
    }
}

impl fmt::Display for JobListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {}",
            self.key,
            self.cron.as_deref().unwrap_or("no-cron"),
            self.name
        )
    }
}

/// Handle of a triggered batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunHandle {
    pub run_id: RunId,
    pub job_keys: Vec<String>,
}

/// Entry point for running configured jobs
#[derive(Clone)]
pub struct Exporter {
    config: Arc<ExporterConfig>,
    runner: JobRunner,
    runs: RunRegistry,
}

impl Exporter {
    /// Builds an exporter with injected collaborators
    pub fn new(
        config: ExporterConfig,
        transport: Arc<dyn ApiTransport>,
        tokens: Arc<dyn TokenProvider>,
        extensions: ExtensionRegistry,
    ) -> Result<Self> {
        let http = HttpTransport::new(&config.credentials)?;
        let requests = RequestStage::new(
            transport,
            tokens,
            config.credentials.api_base_url(),
            config.retry.clone(),
        );
        let config = Arc::new(config);
        let runner = JobRunner::new(
            config.clone(),
            requests,
            Arc::new(extensions),
            ExportStage::new(http.client().clone()),
        );

        Ok(Self {
            config,
            runner,
            runs: RunRegistry::new(),
        })
    }

    /// Builds an exporter that talks to the configured API over HTTP
    pub fn from_config(config: ExporterConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config.credentials)?);
        Self::new(config, transport, tokens, ExtensionRegistry::with_defaults())
    }

    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    pub fn runner(&self) -> &JobRunner {
        &self.runner
    }

    /// Configured jobs in key order
    pub fn list_jobs(&self) -> Vec<JobListing> {
        self.config.jobs.values().map(JobListing::from_spec).collect()
    }

    /// Jobs for `keys`; empty means every job. Unknown keys are logged and skipped.
    pub fn select_jobs(&self, keys: &[String]) -> Vec<JobSpec> {
        if keys.is_empty() {
            return self.config.jobs.values().cloned().collect();
        }

        keys.iter()
            .filter_map(|key| match self.config.job(key) {
                Some(job) => Some(job.clone()),
                None => {
                    tracing::warn!(job_key = %key, "Unknown job key, skipping");
                    None
                }
            })
            .collect()
    }

    /// Runs the selected jobs concurrently and waits for all of them
    pub async fn run_now(&self, keys: &[String]) -> Vec<RunResult> {
        self.run_batch(self.select_jobs(keys), RunLog::new()).await
    }

    /// Starts a batch in the background and returns immediately
    pub fn trigger(&self, keys: &[String]) -> RunHandle {
        let jobs = self.select_jobs(keys);
        let run_id = RunId::generate();
        let job_keys: Vec<String> = jobs.iter().map(|j| j.key.clone()).collect();
        let log = self.runs.insert(run_id, job_keys.clone());

        tracing::info!(run_id = %run_id, jobs = ?job_keys, "Batch triggered");

        let this = self.clone();
        tokio::spawn(async move {
            let results = this.run_batch(jobs, log).await;
            let failed = results.iter().filter(|r| !r.is_success()).count();
            tracing::info!(run_id = %run_id, runs = results.len(), failed, "Batch complete");
            this.runs.complete(&run_id);
        });

        RunHandle { run_id, job_keys }
    }

    /// Output so far of a triggered batch
    pub fn poll(&self, run_id: &RunId) -> RunPoll {
        self.runs.poll(run_id)
    }

    /// Starts timers for every job with a cron expression
    pub fn schedule(&self, keys: &[String], shutdown: watch::Receiver<bool>) -> (Scheduler, ScheduleReport) {
        let executor: Arc<dyn JobExecutor> = Arc::new(self.runner.clone());
        let mut scheduler = Scheduler::new(executor).with_timezone(self.config.cron_timezone);
        let report = scheduler.start(self.select_jobs(keys), shutdown);
        (scheduler, report)
    }

    async fn run_batch(&self, jobs: Vec<JobSpec>, log: RunLog) -> Vec<RunResult> {
        let tasks = jobs.into_iter().map(|job| {
            let runner = self.runner.clone();
            let log = log.clone();
            tokio::spawn(async move { runner.run(job, &log).await })
        });

        let mut results = Vec::new();
        for joined in join_all(tasks).await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => tracing::error!(error = %e, "Job task ended abnormally"),
            }
        }
        results.sort_by(|a, b| a.job_key.cmp(&b.job_key));
        results
    }
}
