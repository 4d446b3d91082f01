//! Validate config command implementation
//!
//! Loading already validates; this command reports the outcome and prints a
//! summary of what the file defines.

use crate::cli::Cli;
use crate::core::scheduler::CronSchedule;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, cli: &Cli) -> anyhow::Result<i32> {
        tracing::info!(config_path = %cli.config, "Validating configuration");

        println!("🔍 Validating configuration file: {}", cli.config);
        println!();

        let config = match cli.load_config() {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Environment: {}", config.credentials.environment);
        println!("  API Base URL: {}", config.credentials.api_base_url());
        println!(
            "  Client Credentials: {}",
            if config.credentials.has_client_credentials() {
                "configured"
            } else {
                "not configured"
            }
        );
        println!("  Max Retries: {}", config.retry.max_retries);
        println!("  Requests: {}", config.requests.len());
        println!("  Transforms: {}", config.transforms.len());
        println!("  Templates: {}", config.templates.len());
        println!("  Exports: {}", config.exports.len());
        println!("  Jobs: {}", config.jobs.len());

        // Cron problems only skip the job at scheduling time; flag them here
        for job in config.jobs.values() {
            if let Some(cron) = job.cron.as_deref().filter(|c| !c.trim().is_empty()) {
                if let Err(e) = CronSchedule::parse(cron) {
                    println!("  ⚠️  {}: {e}", job.key);
                }
            }
        }
        println!();
        Ok(0)
    }
}
