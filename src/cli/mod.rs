//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for the exporter using clap.

pub mod commands;

use crate::auth::{BearerCredential, ClientCredentialsProvider, StaticTokenProvider, TokenProvider};
use crate::config::{load_config, secret_string, ExporterConfig};
use crate::domain::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;

/// Open Data Exporter - scheduled analytics report pipelines
#[derive(Parser, Debug)]
#[command(name = "ode")]
#[command(version, about, long_about = None)]
#[command(author = "Open Data Exporter Contributors")]
pub struct Cli {
    /// Path to configuration file (JSON, or TOML with a .toml extension)
    #[arg(short, long, default_value = "exporter.json", env = "ODE_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "ODE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// OAuth client id (overrides the configuration file)
    #[arg(long)]
    pub client_id: Option<String>,

    /// OAuth client secret (overrides the configuration file)
    #[arg(long)]
    pub client_secret: Option<String>,

    /// Pre-obtained bearer token; skips the client-credentials grant
    #[arg(long, env = "ODE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Lifetime of --access-token in seconds
    #[arg(long, requires = "access_token")]
    pub token_expires_in: Option<u64>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run jobs now, or schedule them by cron until interrupted
    Run(commands::run::RunArgs),

    /// List configured jobs
    ListJobs(commands::list_jobs::ListJobsArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),

    /// Print a PKCE authorization URL for interactive login
    LoginUrl(commands::login_url::LoginUrlArgs),
}

impl Cli {
    /// Loads the configuration and applies the credential flags
    pub fn load_config(&self) -> Result<ExporterConfig> {
        let mut config = load_config(&self.config)?;
        self.apply_credential_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_credential_overrides(&self, config: &mut ExporterConfig) {
        if let Some(id) = &self.client_id {
            tracing::info!("Overriding client id from CLI");
            config.credentials.client_id = Some(id.clone());
        }
        if let Some(secret) = &self.client_secret {
            tracing::info!("Overriding client secret from CLI");
            config.credentials.client_secret = Some(secret_string(secret.clone()));
        }
    }

    /// Static token when `--access-token` is given, client credentials otherwise
    pub fn token_provider(&self, config: &ExporterConfig) -> Result<Arc<dyn TokenProvider>> {
        match &self.access_token {
            Some(token) => {
                let mut credential = BearerCredential::new(token.clone());
                if let Some(secs) = self.token_expires_in {
                    credential = credential.expiring_in(Duration::from_secs(secs));
                }
                Ok(Arc::new(StaticTokenProvider::new(credential)))
            }
            None => Ok(Arc::new(ClientCredentialsProvider::from_config(
                &config.credentials,
            )?)),
        }
    }
}

/// Splits a comma-separated `--jobs` value
pub fn parse_job_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_config, ConfigFormat};

    #[test]
    fn test_cli_parse_run_now() {
        let cli = Cli::parse_from(["ode", "run", "--now", "--jobs", "a,b"]);
        assert_eq!(cli.config, "exporter.json");
        match cli.command {
            Commands::Run(args) => {
                assert!(args.now);
                assert_eq!(args.jobs.as_deref(), Some("a,b"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_with_config_and_level() {
        let cli = Cli::parse_from(["ode", "--config", "custom.toml", "--log-level", "debug", "list-jobs"]);
        assert_eq!(cli.config, "custom.toml");
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::ListJobs(_)));
    }

    #[test]
    fn test_cli_parse_other_commands() {
        assert!(matches!(
            Cli::parse_from(["ode", "validate-config"]).command,
            Commands::ValidateConfig(_)
        ));
        assert!(matches!(Cli::parse_from(["ode", "init"]).command, Commands::Init(_)));
        assert!(matches!(Cli::parse_from(["ode", "login-url"]).command, Commands::LoginUrl(_)));
    }

    #[test]
    fn test_token_expiry_requires_token() {
        assert!(Cli::try_parse_from(["ode", "--token-expires-in", "60", "run"]).is_err());
    }

    #[test]
    fn test_credential_overrides() {
        let cli = Cli::parse_from(["ode", "--client-id", "cli-id", "--client-secret", "s3cret", "run"]);
        let mut config = parse_config("{}", ConfigFormat::Json).unwrap();
        cli.apply_credential_overrides(&mut config);
        assert_eq!(config.credentials.client_id.as_deref(), Some("cli-id"));
        assert!(config.credentials.has_client_credentials());
    }

    #[tokio::test]
    async fn test_access_token_provider() {
        let cli = Cli::parse_from(["ode", "--access-token", "tok", "--token-expires-in", "600", "run"]);
        let config = parse_config("{}", ConfigFormat::Json).unwrap();
        let provider = cli.token_provider(&config).unwrap();
        let credential = provider.credential().await.unwrap();
        assert_eq!(credential.expose_token(), "tok");
        assert!(credential.expires_at().is_some());
    }

    #[test]
    fn test_parse_job_list() {
        assert_eq!(parse_job_list(Some(" a, ,b ")), vec!["a".to_string(), "b".to_string()]);
        assert!(parse_job_list(None).is_empty());
    }
}
