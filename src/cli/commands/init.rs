//! Init command implementation
//!
//! Writes the sample daily report-card configuration.

use crate::config::SAMPLE_CONFIG;
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "exporter.json")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing exporter configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        match fs::write(&self.output, SAMPLE_CONFIG) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Set ODE_SAMPLE_CLIENT_ID and ODE_SAMPLE_CLIENT_SECRET (or edit the file)");
                println!("  2. Validate configuration: ode --config {} validate-config", self.output);
                println!("  3. Try it once: ode --config {} run --now", self.output);
                println!("  4. Schedule it: ode --config {} run", self.output);
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_writes_sample_and_refuses_overwrite() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("exporter.json").to_string_lossy().to_string();

        let args = InitArgs {
            output: output.clone(),
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), 0);
        assert_eq!(fs::read_to_string(&output).unwrap(), SAMPLE_CONFIG);

        assert_eq!(args.execute().await.unwrap(), 2);

        let forced = InitArgs { output, force: true };
        assert_eq!(forced.execute().await.unwrap(), 0);
    }
}
