//! Configuration schema types
//!
//! This module defines the configuration structure consumed by the engine.
//! Keys are camelCase so existing JSON configuration files load unchanged.

use crate::config::secret::is_blank_secret;
use crate::config::SecretString;
use crate::domain::job::{
    ConfigurationDef, ExportDef, JobPlan, JobSpec, RequestDef, SinkKind, TemplateDef,
    TransformDef, TransformKind,
};
use crate::domain::{ExporterError, JobKey, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main exporter configuration
///
/// This is the root configuration structure that maps to the JSON/TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExporterConfig {
    /// API credentials and environment
    #[serde(default, alias = "purecloud", alias = "pureCloud")]
    pub credentials: CredentialsConfig,

    /// Retry policy for request stages
    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub requests: BTreeMap<String, RequestDef>,

    #[serde(default)]
    pub transforms: BTreeMap<String, TransformDef>,

    #[serde(default)]
    pub templates: BTreeMap<String, TemplateDef>,

    #[serde(default)]
    pub exports: BTreeMap<String, ExportDef>,

    #[serde(default)]
    pub configurations: BTreeMap<String, ConfigurationDef>,

    /// Job key → job definition
    #[serde(default)]
    pub jobs: BTreeMap<String, JobSpec>,

    /// Opaque bag passed through to template contexts untouched
    #[serde(default)]
    pub custom_data: Map<String, Value>,

    /// Clock cron expressions are read against
    #[serde(default)]
    pub cron_timezone: CronTimezone,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Directory relative paths in the file resolve against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl ExporterConfig {
    /// Copies every map key into the `name`/`key` field of its definition
    pub fn normalize(&mut self) {
        for (name, def) in self.requests.iter_mut() {
            def.name = name.clone();
        }
        for (name, def) in self.transforms.iter_mut() {
            def.name = name.clone();
        }
        for (name, def) in self.templates.iter_mut() {
            def.name = name.clone();
        }
        for (name, def) in self.exports.iter_mut() {
            def.name = name.clone();
        }
        for (key, job) in self.jobs.iter_mut() {
            job.key = key.clone();
        }
    }

    /// Validates the configuration
    ///
    /// Checks structure and cross references. Cron expressions are NOT
    /// checked here: a bad expression only disables its own job when the
    /// scheduler starts.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.credentials.validate()?;
        self.retry.validate()?;
        self.logging.validate()?;

        for (name, def) in &self.requests {
            if def.endpoint.trim().is_empty() {
                return Err(format!("requests.{name}.endpoint cannot be empty"));
            }
        }

        for (name, def) in &self.transforms {
            match def.kind {
                TransformKind::Extension if def.extension_ref().is_none() => {
                    return Err(format!(
                        "transforms.{name} is an extension transform but names no extension"
                    ));
                }
                TransformKind::Builtin if def.function.is_none() => {
                    return Err(format!(
                        "transforms.{name} is a builtin transform but names no function"
                    ));
                }
                _ => {}
            }
        }

        for (name, def) in &self.templates {
            match (&def.template, &def.template_file) {
                (Some(_), Some(_)) => {
                    return Err(format!(
                        "templates.{name} sets both template and templateFile"
                    ))
                }
                (None, None) => {
                    return Err(format!(
                        "templates.{name} needs either template or templateFile"
                    ))
                }
                _ => {}
            }
        }

        for (name, def) in &self.exports {
            match def.sink {
                SinkKind::File if def.destination.is_none() => {
                    return Err(format!("exports.{name}: file export needs a destination"));
                }
                SinkKind::Http => {
                    let url = def.url.as_deref().unwrap_or_default();
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        return Err(format!(
                            "exports.{name}: http export needs a url starting with http:// or https://"
                        ));
                    }
                }
                _ => {}
            }
        }

        for (key, job) in &self.jobs {
            JobKey::new(key.as_str()).map_err(|e| format!("Invalid job key '{key}': {e}"))?;
            check_refs(key, "requests", &job.requests, &self.requests)?;
            check_refs(key, "transforms", &job.transforms, &self.transforms)?;
            check_refs(key, "templates", &job.templates, &self.templates)?;
            check_refs(key, "exports", &job.exports, &self.exports)?;
            check_refs(key, "configurations", &job.configurations, &self.configurations)?;
        }

        Ok(())
    }

    /// Looks up a job by key
    pub fn job(&self, key: &str) -> Option<&JobSpec> {
        self.jobs.get(key)
    }

    /// Builds the owned, resolved plan for a job
    ///
    /// Every stage definition is cloned; the returned plan shares nothing
    /// with `self`.
    pub fn resolve_job(&self, spec: &JobSpec) -> Result<JobPlan> {
        let missing = |kind: &str, name: &str| {
            ExporterError::Configuration(format!(
                "Job '{}' references unknown {kind} '{name}'",
                spec.key
            ))
        };

        let requests = spec
            .requests
            .iter()
            .map(|n| self.requests.get(n).cloned().ok_or_else(|| missing("request", n)))
            .collect::<Result<Vec<_>>>()?;
        let transforms = spec
            .transforms
            .iter()
            .map(|n| self.transforms.get(n).cloned().ok_or_else(|| missing("transform", n)))
            .collect::<Result<Vec<_>>>()?;
        let templates = spec
            .templates
            .iter()
            .map(|n| self.templates.get(n).cloned().ok_or_else(|| missing("template", n)))
            .map(|r| r.map(|def| self.with_resolved_template_path(def)))
            .collect::<Result<Vec<_>>>()?;
        let exports = spec
            .exports
            .iter()
            .map(|n| self.exports.get(n).cloned().ok_or_else(|| missing("export", n)))
            .collect::<Result<Vec<_>>>()?;

        let mut custom_data = self.custom_data.clone();
        for name in &spec.configurations {
            let configuration = self
                .configurations
                .get(name)
                .ok_or_else(|| missing("configuration", name))?;
            for (k, v) in &configuration.custom_data {
                custom_data.insert(k.clone(), v.clone());
            }
        }

        Ok(JobPlan {
            key: spec.key.clone(),
            name: spec.display_name().to_string(),
            requests,
            transforms,
            templates,
            exports,
            custom_data,
        })
    }

    fn with_resolved_template_path(&self, mut def: TemplateDef) -> TemplateDef {
        if let Some(path) = def.template_file.take() {
            def.template_file = Some(resolve_path(&self.base_dir, &path));
        }
        def
    }
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() || base.as_os_str().is_empty() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn check_refs<T>(
    job: &str,
    kind: &str,
    refs: &[String],
    defined: &BTreeMap<String, T>,
) -> std::result::Result<(), String> {
    for name in refs {
        if !defined.contains_key(name) {
            return Err(format!(
                "jobs.{job}.{kind} references '{name}', which is not defined under {kind}"
            ));
        }
    }
    Ok(())
}

/// API credentials block
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsConfig {
    /// OAuth client id
    #[serde(default)]
    pub client_id: Option<String>,

    /// OAuth client secret
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub client_secret: Option<SecretString>,

    /// Redirect URI registered for the authorization-code flow
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// Cloud environment domain, e.g. `mypurecloud.com`
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Per-call timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout: u64,

    /// Overrides `https://api.<environment>`
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Overrides `https://login.<environment>`
    #[serde(default)]
    pub login_base_url: Option<String>,
}

impl CredentialsConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.environment.trim().is_empty() {
            return Err("credentials.environment cannot be empty".to_string());
        }
        if self.timeout == 0 {
            return Err("credentials.timeout must be > 0".to_string());
        }
        for (field, url) in [
            ("apiBaseUrl", &self.api_base_url),
            ("loginBaseUrl", &self.login_base_url),
        ] {
            if let Some(url) = url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(format!(
                        "credentials.{field} must start with http:// or https://"
                    ));
                }
            }
        }
        Ok(())
    }

    /// Whether a client id/secret pair is configured
    pub fn has_client_credentials(&self) -> bool {
        self.client_id.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
            && !is_blank_secret(self.client_secret.as_ref())
    }

    /// Base URL for API calls, without trailing slash
    pub fn api_base_url(&self) -> String {
        self.api_base_url
            .clone()
            .unwrap_or_else(|| format!("https://api.{}", self.environment))
            .trim_end_matches('/')
            .to_string()
    }

    /// Base URL of the login service, without trailing slash
    pub fn login_base_url(&self) -> String {
        self.login_base_url
            .clone()
            .unwrap_or_else(|| format!("https://login.{}", self.environment))
            .trim_end_matches('/')
            .to_string()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            environment: default_environment(),
            timeout: default_timeout_ms(),
            api_base_url: None,
            login_base_url: None,
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.max_retries > 10 {
            return Err(format!(
                "retry.maxRetries must be <= 10, got {}",
                self.max_retries
            ));
        }
        if self.backoff_multiplier < 1.0 {
            return Err(format!(
                "retry.backoffMultiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            ));
        }
        Ok(())
    }

    /// Delay before retry number `attempt` (1-based), capped at `max_delay_ms`
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let factor = self
            .backoff_multiplier
            .powi(attempt.saturating_sub(1) as i32);
        let delay_ms = (self.initial_delay_ms as f64 * factor).min(self.max_delay_ms as f64);
        Duration::from_millis(delay_ms as u64)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// Timezone of cron fire times
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CronTimezone {
    /// Server local time
    #[default]
    Local,
    Utc,
}

impl FromStr for CronTimezone {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "utc" => Ok(Self::Utc),
            other => Err(format!("Invalid cron timezone '{other}'. Must be 'local' or 'utc'")),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable local JSON file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily or hourly)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid logging.logLevel '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }

        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.localRotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_environment() -> String {
    "mypurecloud.com".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_retries() -> usize {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
