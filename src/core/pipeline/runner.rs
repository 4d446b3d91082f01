//! Job runner - executes one job instance
//!
//! A run resolves its [`JobSpec`] into an owned [`JobPlan`], allocates a fresh
//! [`DataBag`], executes every stage in order and drops the bag when done.
//! The first failing stage ends the run; other runs are unaffected.

use super::result::{RunResult, RunStatus, StageOutcome};
use crate::config::ExporterConfig;
use crate::core::extensions::ExtensionRegistry;
use crate::core::runs::RunLog;
use crate::core::stages::{render_template, ExportStage, RequestStage, StageContext, StageKind, TransformStage};
use crate::domain::{DataBag, ExporterError, JobPlan, JobSpec, Result, RunId};
use crate::{log_error_with_context, log_run_complete, log_run_start};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Something that can run a job to completion
///
/// The scheduler and the run-now path only see this trait.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(&self, job: JobSpec, log: RunLog) -> RunResult;
}

/// Runs jobs against shared stage collaborators
#[derive(Clone)]
pub struct JobRunner {
    config: Arc<ExporterConfig>,
    requests: RequestStage,
    transforms: TransformStage,
    exports: ExportStage,
}

impl JobRunner {
    pub fn new(
        config: Arc<ExporterConfig>,
        requests: RequestStage,
        extensions: Arc<ExtensionRegistry>,
        exports: ExportStage,
    ) -> Self {
        Self {
            config,
            requests,
            transforms: TransformStage::new(extensions),
            exports,
        }
    }

    /// Runs `job` under a fresh run id
    pub async fn run(&self, job: JobSpec, log: &RunLog) -> RunResult {
        self.run_with_id(RunId::generate(), job, log).await
    }

    pub async fn run_with_id(&self, run_id: RunId, job: JobSpec, log: &RunLog) -> RunResult {
        let start_time = Instant::now();
        let mut result = RunResult::new(run_id, job.key.clone(), job.display_name());

        log_run_start!(run_id, job.key);
        log.line(format!("Starting job {} ({})", job.key, run_id));

        match self.config.resolve_job(&job) {
            Ok(plan) => self.execute_plan(plan, &mut result, log).await,
            Err(e) => {
                log_error_with_context!(e, format!("Job {} could not be resolved", job.key));
                result.status = RunStatus::Failed {
                    stage_kind: None,
                    stage: None,
                    error: e.to_string(),
                };
            }
        }

        let result = result.with_duration(start_time.elapsed());
        match result.failure_message() {
            None => log.line(format!("Job {} finished", job.key)),
            Some(message) => log.line(format!("Job {} failed at {}", job.key, message)),
        }
        log_run_complete!(run_id, job.key, result.is_success(), result.duration);
        result.log_summary();
        result
    }

    async fn execute_plan(&self, plan: JobPlan, result: &mut RunResult, log: &RunLog) {
        let mut bag = DataBag::new();
        let ctx = StageContext::new(result.run_id, &plan, result.started_at);

        for def in &plan.requests {
            let outcome = timed(StageKind::Request, &def.name, log, self.requests.execute(def, &mut bag, &ctx)).await;
            if !record(result, outcome, &bag) {
                return;
            }
        }

        for def in &plan.transforms {
            let outcome = timed(StageKind::Transform, &def.name, log, async {
                self.transforms.execute(def, &mut bag)
            })
            .await;
            if !record(result, outcome, &bag) {
                return;
            }
        }

        for def in &plan.templates {
            let outcome = timed(StageKind::Template, &def.name, log, render_template(def, &mut bag, &ctx)).await;
            if !record(result, outcome, &bag) {
                return;
            }
        }

        for def in &plan.exports {
            let outcome = timed(StageKind::Export, &def.name, log, async {
                let location = self.exports.execute(def, &bag, &ctx).await?;
                log.line(format!("Exported {} to {}", def.source, location));
                Ok::<(), ExporterError>(())
            })
            .await;
            if !record(result, outcome, &bag) {
                return;
            }
        }
    }
}

#[async_trait]
impl JobExecutor for JobRunner {
    async fn execute(&self, job: JobSpec, log: RunLog) -> RunResult {
        self.run(job, &log).await
    }
}

/// Outcome of one stage before it is folded into the run result
struct Timed {
    outcome: StageOutcome,
    error: Option<ExporterError>,
}

async fn timed<F>(kind: StageKind, name: &str, log: &RunLog, stage: F) -> Timed
where
    F: Future<Output = Result<()>>,
{
    tracing::debug!(stage_kind = %kind, stage = %name, "Stage starting");
    let started = Instant::now();
    let outcome = stage.await;
    let duration = started.elapsed();

    match &outcome {
        Ok(()) => log.line(format!("{kind} {name} done in {}ms", duration.as_millis())),
        Err(e) => {
            tracing::error!(stage_kind = %kind, stage = %name, error = %e, "Stage failed");
            log.line(format!("{kind} {name} failed: {e}"));
        }
    }

    Timed {
        outcome: StageOutcome {
            kind,
            name: name.to_string(),
            duration,
            ok: outcome.is_ok(),
        },
        error: outcome.err(),
    }
}

/// Folds a stage outcome into the result; `false` ends the run
fn record(result: &mut RunResult, timed: Timed, bag: &DataBag) -> bool {
    let Timed { outcome, error } = timed;
    let kind = outcome.kind;
    let stage = outcome.name.clone();
    result.stages.push(outcome);

    match error {
        None => true,
        Some(error) => {
            if matches!(error, ExporterError::Transform(_)) {
                result.diagnostics = Some(bag.keys());
            }
            result.status = RunStatus::Failed {
                stage_kind: Some(kind),
                stage: Some(stage),
                error: error.to_string(),
            };
            false
        }
    }
}
