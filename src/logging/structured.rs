//! Subscriber setup
//!
//! Human-readable console output always. When `logging.localEnabled` is set,
//! the same events also go as JSON lines to a rolling file under
//! `logging.localPath`, which is what the long-running scheduler uses.

use crate::config::LoggingConfig;
use crate::domain::{ExporterError, Result};
use std::str::FromStr;
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// File name prefix of rotated log files
const LOG_FILE_PREFIX: &str = "ode.log";

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Flushes the file writer when dropped
///
/// Hold it until the process exits; `main` drops it right before
/// `process::exit`.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Installs the global subscriber
///
/// `RUST_LOG` wins when set; otherwise only this crate logs, at `log_level`.
///
/// # Errors
///
/// An unknown level, an uncreatable log directory, or a subscriber that was
/// already installed.
///
/// # Example
///
/// ```no_run
/// use open_data_exporter::logging::init_logging;
/// use open_data_exporter::config::LoggingConfig;
///
/// let config = LoggingConfig::default();
/// let _guard = init_logging("info", &config).expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    let level = parse_log_level(log_level)?;
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(level)))
    };

    let mut layers: Vec<BoxedLayer<Registry>> = vec![console_layer().with_filter(filter()).boxed()];

    let file_guard = if config.local_enabled {
        let (layer, guard) = file_layer(config)?;
        layers.push(layer.with_filter(filter()).boxed());
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| ExporterError::Other(format!("Failed to initialize logging: {e}")))?;

    tracing::debug!(
        level = %level,
        file_logging = config.local_enabled,
        path = %config.local_path,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

fn console_layer<S>() -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .boxed()
}

fn file_layer<S>(config: &LoggingConfig) -> Result<(BoxedLayer<S>, WorkerGuard)>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    std::fs::create_dir_all(&config.local_path).map_err(|e| {
        ExporterError::Configuration(format!(
            "Failed to create log directory {}: {e}",
            config.local_path
        ))
    })?;

    let appender = RollingFileAppender::new(
        rotation(&config.local_rotation),
        &config.local_path,
        LOG_FILE_PREFIX,
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(false)
        .with_thread_ids(true)
        .with_writer(writer)
        .boxed();
    Ok((layer, guard))
}

fn default_directive(level: Level) -> String {
    format!("open_data_exporter={}", level.as_str().to_lowercase())
}

fn rotation(name: &str) -> Rotation {
    if name.eq_ignore_ascii_case("hourly") {
        Rotation::HOURLY
    } else {
        Rotation::DAILY
    }
}

fn parse_log_level(name: &str) -> Result<Level> {
    Level::from_str(name.trim()).map_err(|_| {
        ExporterError::Configuration(format!(
            "Invalid log level '{name}'. Must be one of: trace, debug, info, warn, error"
        ))
    })
}
