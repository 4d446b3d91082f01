//! List-jobs command implementation

use crate::cli::{parse_job_list, Cli};
use crate::core::JobListing;
use clap::Args;

/// Arguments for the list-jobs command
#[derive(Args, Debug)]
pub struct ListJobsArgs {
    /// Only these job keys (comma-separated)
    #[arg(long)]
    pub jobs: Option<String>,
}

impl ListJobsArgs {
    /// Execute the list-jobs command
    pub async fn execute(&self, cli: &Cli) -> anyhow::Result<i32> {
        let config = match cli.load_config() {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        let keys = parse_job_list(self.jobs.as_deref());
        let listings: Vec<JobListing> = config
            .jobs
            .values()
            .filter(|job| keys.is_empty() || keys.contains(&job.key))
            .map(JobListing::from_spec)
            .collect();

        for listing in &listings {
            println!("{listing}");
        }
        tracing::debug!(count = listings.len(), "Listed jobs");
        Ok(0)
    }
}
