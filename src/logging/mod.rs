//! Logging and observability
//!
//! Structured logging through `tracing`, plus a few macros that keep the
//! field names of run-level events consistent.
//!
//! # Example
//!
//! ```no_run
//! use open_data_exporter::logging::init_logging;
//! use open_data_exporter::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(job_key = "daily_report_card", "Job scheduled");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a job run
///
/// # Example
///
/// ```no_run
/// use open_data_exporter::log_run_start;
/// use open_data_exporter::domain::RunId;
///
/// let run_id = RunId::generate();
/// log_run_start!(&run_id, "daily_report_card");
/// ```
#[macro_export]
macro_rules! log_run_start {
    ($run_id:expr, $job_key:expr) => {
        tracing::info!(
            run_id = %$run_id,
            job_key = %$job_key,
            "Starting job run"
        );
    };
}

/// Log the completion of a job run
///
/// # Example
///
/// ```no_run
/// use open_data_exporter::log_run_complete;
/// use open_data_exporter::domain::RunId;
/// use std::time::Duration;
///
/// let run_id = RunId::generate();
/// log_run_complete!(&run_id, "daily_report_card", true, Duration::from_secs(3));
/// ```
#[macro_export]
macro_rules! log_run_complete {
    ($run_id:expr, $job_key:expr, $success:expr, $duration:expr) => {
        tracing::info!(
            run_id = %$run_id,
            job_key = %$job_key,
            success = $success,
            duration_ms = $duration.as_millis() as u64,
            "Job run finished"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use open_data_exporter::log_error_with_context;
/// use open_data_exporter::domain::ExporterError;
///
/// let error = ExporterError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = %$context,
            "Error occurred"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use open_data_exporter::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, 2000u64, "Server error: 503");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_retries:expr, $delay_ms:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_retries = $max_retries,
            delay_ms = $delay_ms,
            reason = %$reason,
            "Request failed, retrying with exponential backoff"
        );
    };
}
