//! Cron scheduling of jobs

pub mod schedule;
#[allow(clippy::module_inception)]
pub mod scheduler;

pub use schedule::{CronSchedule, Schedule};
pub use scheduler::{ScheduleReport, Scheduler};
