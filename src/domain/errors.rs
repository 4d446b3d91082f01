//! Domain error types
//!
//! This module defines the error hierarchy for the exporter. Every stage kind
//! has its own error enum so a failed run can report which part of the
//! pipeline broke; all of them convert into [`ExporterError`].

use std::time::Duration;
use thiserror::Error;

/// Main exporter error type
///
/// This is the primary error type used throughout the application.
/// It wraps stage-specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum ExporterError {
    /// Configuration-related errors (bad references, malformed cron, ...)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Retrieval errors raised by a request stage
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Transform errors raised by a builtin or extension transform
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// Template rendering errors
    #[error("Template error: {0}")]
    Template(String),

    /// Export sink errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Authentication errors (token acquisition, expired credentials)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl ExporterError {
    /// Short name of the error kind, used in run summaries
    pub fn kind(&self) -> &'static str {
        match self {
            ExporterError::Configuration(_) => "config",
            ExporterError::Request(_) => "request",
            ExporterError::Transform(_) => "transform",
            ExporterError::Template(_) => "template",
            ExporterError::Export(_) => "export",
            ExporterError::Authentication(_) => "authentication",
            ExporterError::Io(_) => "io",
            ExporterError::Serialization(_) => "serialization",
            ExporterError::Other(_) => "other",
        }
    }
}

/// Remote API retrieval errors
///
/// These errors don't expose third-party HTTP client types.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Failed to reach the API
    #[error("Failed to connect to API: {0}")]
    ConnectionFailed(String),

    /// Credential rejected or unavailable
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Credential lacks the scope the request requires
    #[error("Credential is missing required scope '{0}'")]
    MissingScope(String),

    /// Invalid response body
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded (429)
    #[error("Rate limit exceeded, retry after: {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Endpoint or body template could not be rendered
    #[error("Invalid request definition: {0}")]
    InvalidDefinition(String),
}

impl RequestError {
    /// Whether the retry policy should try this request again
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RequestError::ConnectionFailed(_)
                | RequestError::Timeout(_)
                | RequestError::RateLimited { .. }
                | RequestError::ServerError { .. }
        )
    }

    /// Builds the error matching a non-success HTTP status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => RequestError::AuthenticationFailed(format!("{status} - {message}")),
            429 => RequestError::RateLimited { retry_after: None },
            500..=599 => RequestError::ServerError { status, message },
            _ => RequestError::ClientError { status, message },
        }
    }
}

/// Transform errors
#[derive(Debug, Error)]
pub enum TransformError {
    /// No extension registered under the referenced name
    #[error("Unknown extension: {0}")]
    UnknownExtension(String),

    /// Unknown builtin transform
    #[error("Unknown builtin transform: {0}")]
    UnknownBuiltin(String),

    /// Input in the DataBag has an unusable shape
    #[error("Invalid transform input: {0}")]
    InvalidInput(String),

    /// Transform function raised
    #[error("Transform '{name}' failed: {message}")]
    Failed { name: String, message: String },
}

/// Export sink errors
#[derive(Debug, Error)]
pub enum ExportError {
    /// The artifact to export is not in the DataBag
    #[error("Artifact '{0}' not found in run data")]
    MissingArtifact(String),

    /// Sink type not supported
    #[error("Unsupported sink type: {0}")]
    UnsupportedSink(String),

    /// Delivery to the sink failed
    #[error("Delivery to '{sink}' failed: {message}")]
    DeliveryFailed { sink: String, message: String },
}

// Conversion from std::io::Error
impl From<std::io::Error> for ExporterError {
    fn from(err: std::io::Error) -> Self {
        ExporterError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for ExporterError {
    fn from(err: serde_json::Error) -> Self {
        ExporterError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for ExporterError {
    fn from(err: toml::de::Error) -> Self {
        ExporterError::Configuration(format!("TOML parse error: {err}"))
    }
}

// Conversion from handlebars render errors
impl From<handlebars::RenderError> for ExporterError {
    fn from(err: handlebars::RenderError) -> Self {
        ExporterError::Template(err.to_string())
    }
}
