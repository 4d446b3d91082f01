//! Run command implementation
//!
//! `run --now` executes the selected jobs once and exits; plain `run` starts
//! the cron scheduler and keeps going until Ctrl+C or SIGTERM.

use crate::cli::{parse_job_list, Cli};
use crate::core::{Exporter, RunResult};
use clap::Args;
use tokio::sync::watch;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Job keys to run (comma-separated; default all)
    #[arg(long)]
    pub jobs: Option<String>,

    /// Run once immediately instead of scheduling
    #[arg(long)]
    pub now: bool,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(&self, cli: &Cli, mut shutdown_signal: watch::Receiver<bool>) -> anyhow::Result<i32> {
        tracing::info!(now = self.now, jobs = ?self.jobs, "Starting run command");

        let config = match cli.load_config() {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Configuration could not be loaded");
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        let tokens = match cli.token_provider(&config) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(error = %e, "No usable credentials");
                eprintln!("Credential error: {e}");
                return Ok(2);
            }
        };

        let exporter = Exporter::from_config(config, tokens)?;
        let keys = parse_job_list(self.jobs.as_deref());

        if self.now {
            println!("🚀 Running jobs...");
            println!();
            let results = exporter.run_now(&keys).await;
            return Ok(print_results(&results));
        }

        let (scheduler, report) = exporter.schedule(&keys, shutdown_signal.clone());
        for key in &report.scheduled {
            println!("⏰ Scheduled {key}");
        }
        for (key, reason) in &report.skipped {
            println!("⚠️  Not scheduled {key}: {reason}");
        }

        if report.scheduled.is_empty() {
            println!("No jobs with a valid cron expression. Use --now to run on demand.");
            return Ok(if report.skipped.is_empty() { 0 } else { 2 });
        }

        println!();
        println!("Scheduler running. Press Ctrl+C to stop.");

        while !*shutdown_signal.borrow() {
            if shutdown_signal.changed().await.is_err() {
                break;
            }
        }

        tracing::info!("Stopping scheduler");
        scheduler.join().await;
        println!("✅ Scheduler stopped");
        Ok(0)
    }
}

/// Prints one line per run and returns the exit code
fn print_results(results: &[RunResult]) -> i32 {
    if results.is_empty() {
        println!("No matching jobs.");
        return 0;
    }

    for result in results {
        match result.failure_message() {
            None => println!(
                "  ✅ {} ({:.2}s)",
                result.job_key,
                result.duration.as_secs_f64()
            ),
            Some(message) => println!("  ❌ {}: {message}", result.job_key),
        }
    }
    println!();

    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed == 0 {
        println!("✅ All {} job(s) completed successfully!", results.len());
        0
    } else {
        println!("⚠️  {failed} of {} job(s) failed", results.len());
        1
    }
}
