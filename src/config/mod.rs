//! Configuration management for the exporter.
//!
//! # Overview
//!
//! A single JSON (or TOML, picked by file extension) document describes the
//! API credentials and every named stage and job:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `ODE_*` environment overrides for credentials and logging
//! - Default values for optional settings
//! - Cross-reference validation between jobs and stages
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use open_data_exporter::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("config.json")?;
//!
//! for (key, job) in &config.jobs {
//!     println!("{key} | {}", job.cron.as_deref().unwrap_or("no-cron"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`CredentialsConfig`] - client id/secret, environment, timeout (alias `pureCloud`)
//! - [`RetryConfig`] - backoff for request stages
//! - `requests`, `transforms`, `templates`, `exports`, `configurations` - named stage maps
//! - `jobs` - job key → [`JobSpec`](crate::domain::JobSpec)
//! - `customData` - free-form template variables
//! - `cronTimezone` - `local` (default) or `utc`
//! - [`LoggingConfig`] - logging configuration

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config, ConfigFormat, SAMPLE_CONFIG};
pub use schema::{CredentialsConfig, CronTimezone, ExporterConfig, LoggingConfig, RetryConfig};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
