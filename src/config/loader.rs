//! Configuration loader with JSON/TOML parsing and environment variable overrides

use super::schema::ExporterConfig;
use super::secret::secret_string;
use crate::domain::errors::ExporterError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// On-disk configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Picks the format from the file extension; anything but `.toml` is JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Loads configuration from a JSON or TOML file
///
/// This function:
/// 1. Reads the file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses it into [`ExporterConfig`]
/// 4. Applies environment variable overrides (`ODE_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - Parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use open_data_exporter::config::loader::load_config;
///
/// let config = load_config("config.json").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ExporterConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ExporterError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ExporterError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let mut config = parse_config(&contents, ConfigFormat::from_path(path))?;
    if let Some(parent) = path.parent() {
        config.base_dir = parent.to_path_buf();
    }

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        ExporterError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Parses configuration text without touching the process environment overrides
///
/// `${VAR}` placeholders are still substituted. Stage names are filled in
/// from their map keys; validation is left to the caller.
pub fn parse_config(contents: &str, format: ConfigFormat) -> Result<ExporterConfig> {
    let contents = substitute_env_vars(contents, format)?;

    let mut config: ExporterConfig = match format {
        ConfigFormat::Json => serde_json::from_str(&contents)
            .map_err(|e| ExporterError::Configuration(format!("Failed to parse JSON: {}", e)))?,
        ConfigFormat::Toml => toml::from_str(&contents)
            .map_err(|e| ExporterError::Configuration(format!("Failed to parse TOML: {}", e)))?,
    };
    config.normalize();
    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are left alone in TOML files.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str, format: ConfigFormat) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| ExporterError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if format == ConfigFormat::Toml && line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(ExporterError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

/// Applies environment variable overrides using the `ODE_*` prefix
fn apply_env_overrides(config: &mut ExporterConfig) {
    // Credentials
    if let Ok(val) = std::env::var("ODE_CLIENT_ID") {
        config.credentials.client_id = Some(val);
    }
    if let Ok(val) = std::env::var("ODE_CLIENT_SECRET") {
        config.credentials.client_secret = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("ODE_ENVIRONMENT") {
        config.credentials.environment = val;
    }
    if let Ok(val) = std::env::var("ODE_REDIRECT_URI") {
        config.credentials.redirect_uri = Some(val);
    }
    if let Ok(val) = std::env::var("ODE_TIMEOUT_MS") {
        if let Ok(timeout) = val.parse() {
            config.credentials.timeout = timeout;
        }
    }
    if let Ok(val) = std::env::var("ODE_API_BASE_URL") {
        config.credentials.api_base_url = Some(val);
    }

    // Logging
    if let Ok(val) = std::env::var("ODE_LOG_LEVEL") {
        config.logging.log_level = val;
    }
    if let Ok(val) = std::env::var("ODE_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("ODE_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("ODE_CRON_TIMEZONE") {
        if let Ok(timezone) = val.parse() {
            config.cron_timezone = timezone;
        }
    }
}

/// Starter configuration written by `ode init`
pub const SAMPLE_CONFIG: &str = r#"{
  "pureCloud": {
    "clientId": "${ODE_SAMPLE_CLIENT_ID}",
    "clientSecret": "${ODE_SAMPLE_CLIENT_SECRET}",
    "environment": "mypurecloud.com",
    "timeout": 10000
  },
  "requests": {
    "get_queues": {
      "type": "GET",
      "uri": "/api/v2/routing/queues",
      "pagination": { "type": "pageNumber", "pageSize": 100 }
    },
    "daily_voice_queue_agg": {
      "type": "POST",
      "uri": "/api/v2/analytics/conversations/aggregates/query",
      "body": {
        "interval": "{{dates.yesterdayInterval}}",
        "groupBy": ["queueId"],
        "filter": {
          "type": "and",
          "predicates": [{ "dimension": "mediaType", "value": "voice" }]
        }
      }
    },
    "daily_abandons_detail": {
      "type": "POST",
      "uri": "/api/v2/analytics/conversations/details/query",
      "body": {
        "interval": "{{dates.yesterdayInterval}}",
        "order": "asc",
        "orderBy": "conversationStart",
        "segmentFilters": [{
          "type": "and",
          "predicates": [{ "dimension": "segmentEnd", "value": "abandon" }]
        }]
      },
      "pagination": { "type": "bodyPaging", "pageSize": 100 }
    }
  },
  "transforms": {
    "report_card": {
      "type": "extension",
      "extension": "daily_conversation_report_card",
      "function": "prepareReport"
    }
  },
  "templates": {
    "report_card_text": {
      "template": "{{customData.title}} for {{dates.yesterday}}\nOffered: {{data.report.totals.offered}}  Answered: {{data.report.totals.answered}}  Abandoned: {{data.report.totals.abandoned}} ({{data.report.totals.abandonRatePercent}}%)\n{{#each data.report.worstQueues}}{{this.name}}: {{this.serviceLevelPercent}}%\n{{/each}}"
    }
  },
  "exports": {
    "report_card_file": {
      "type": "file",
      "source": "report_card_text",
      "destination": "./exports",
      "filename": "report-card-{{dates.yesterday}}.txt"
    }
  },
  "configurations": {},
  "customData": { "title": "Daily Conversation Report Card" },
  "jobs": {
    "daily_report_card": {
      "name": "Daily Conversation Report Card",
      "cron": "0 0 6 * * *",
      "requests": ["get_queues", "daily_voice_queue_agg", "daily_abandons_detail"],
      "transforms": ["report_card"],
      "templates": ["report_card_text"],
      "exports": ["report_card_file"]
    }
  }
}
"#;
