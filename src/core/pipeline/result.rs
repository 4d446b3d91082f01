//! Run result and reporting

use crate::core::stages::StageKind;
use crate::domain::RunId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Final state of one job run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RunStatus {
    Succeeded,

    /// The run stopped at `stage`; later stages were not executed
    #[serde(rename_all = "camelCase")]
    Failed {
        /// `None` when the job could not be resolved into a plan
        stage_kind: Option<StageKind>,
        stage: Option<String>,
        error: String,
    },
}

/// Timing of one executed stage
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageOutcome {
    pub kind: StageKind,
    pub name: String,
    pub duration: Duration,
    pub ok: bool,
}

/// Summary of one job run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub run_id: RunId,
    pub job_key: String,
    pub job_name: String,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub status: RunStatus,
    pub stages: Vec<StageOutcome>,

    /// DataBag keys present when a transform failed
    pub diagnostics: Option<Vec<String>>,
}

impl RunResult {
    pub fn new(run_id: RunId, job_key: impl Into<String>, job_name: impl Into<String>) -> Self {
        Self {
            run_id,
            job_key: job_key.into(),
            job_name: job_name.into(),
            started_at: Utc::now(),
            duration: Duration::ZERO,
            status: RunStatus::Succeeded,
            stages: Vec::new(),
            diagnostics: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// Short `kind 'name': error` description of a failure
    pub fn failure_message(&self) -> Option<String> {
        match &self.status {
            RunStatus::Succeeded => None,
            RunStatus::Failed {
                stage_kind: Some(kind),
                stage: Some(stage),
                error,
            } => Some(format!("{kind} '{stage}': {error}")),
            RunStatus::Failed { error, .. } => Some(error.clone()),
        }
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            run_id = %self.run_id,
            job_key = %self.job_key,
            job_name = %self.job_name,
            stages_run = self.stages.len(),
            success = self.is_success(),
            duration_ms = self.duration.as_millis() as u64,
            "Job run summary"
        );

        if let RunStatus::Failed {
            stage_kind,
            stage,
            error,
        } = &self.status
        {
            tracing::warn!(
                run_id = %self.run_id,
                job_key = %self.job_key,
                stage_kind = stage_kind.map(|k| k.as_str()).unwrap_or("plan"),
                stage = stage.as_deref().unwrap_or(""),
                error = %error,
                "Job run failed"
            );
        }

        if let Some(keys) = &self.diagnostics {
            tracing::debug!(
                run_id = %self.run_id,
                data_keys = ?keys,
                "Data bag contents at failure"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_result_is_success() {
        let result = RunResult::new(RunId::generate(), "daily", "Daily")
            .with_duration(Duration::from_millis(5));
        assert!(result.is_success());
        assert!(result.failure_message().is_none());
        assert_eq!(result.duration, Duration::from_millis(5));
    }

    #[test]
    fn test_failure_message() {
        let mut result = RunResult::new(RunId::generate(), "daily", "Daily");
        result.status = RunStatus::Failed {
            stage_kind: Some(StageKind::Transform),
            stage: Some("report_card".to_string()),
            error: "boom".to_string(),
        };
        assert!(!result.is_success());
        assert_eq!(
            result.failure_message().as_deref(),
            Some("transform 'report_card': boom")
        );

        result.status = RunStatus::Failed {
            stage_kind: None,
            stage: None,
            error: "unknown request 'x'".to_string(),
        };
        assert_eq!(result.failure_message().as_deref(), Some("unknown request 'x'"));
    }

    #[test]
    fn test_status_serializes_tagged() {
        let status = RunStatus::Failed {
            stage_kind: Some(StageKind::Export),
            stage: Some("out".to_string()),
            error: "disk full".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            serde_json::json!({
                "status": "failed",
                "stageKind": "export",
                "stage": "out",
                "error": "disk full"
            })
        );
    }
}
