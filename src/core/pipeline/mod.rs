//! Job execution: one run of one job over a fresh DataBag

pub mod result;
pub mod runner;

pub use result::{RunResult, RunStatus, StageOutcome};
pub use runner::{JobExecutor, JobRunner};
