//! Error context extension trait
//!
//! Like `anyhow::Context`, but keeps [`ExporterError`] as the error type so
//! library code can attach the stage or path it was working on.
//!
//! # Examples
//!
//! ```rust
//! use open_data_exporter::domain::Result;
//! use open_data_exporter::domain::context::ResultExt;
//!
//! fn read_template(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .map_err(open_data_exporter::domain::ExporterError::from)
//!         .with_context(|| format!("Failed to read template file: {}", path))
//! }
//! ```

use crate::domain::errors::ExporterError;
use crate::domain::result::Result;

/// Extension trait for adding context to `Result` types
pub trait ResultExt<T> {
    /// Add context to an error (evaluated eagerly)
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static;

    /// Add context computed only when an error occurs
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

/// The error keeps its kind; only the message gains the context prefix.
impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<ExporterError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| prefix(e.into(), &context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| {
            let context = f();
            prefix(e.into(), &context)
        })
    }
}

fn prefix(error: ExporterError, context: &dyn std::fmt::Display) -> ExporterError {
    match error {
        ExporterError::Configuration(m) => ExporterError::Configuration(format!("{context}: {m}")),
        ExporterError::Template(m) => ExporterError::Template(format!("{context}: {m}")),
        ExporterError::Authentication(m) => ExporterError::Authentication(format!("{context}: {m}")),
        ExporterError::Io(m) => ExporterError::Io(format!("{context}: {m}")),
        ExporterError::Serialization(m) => ExporterError::Serialization(format!("{context}: {m}")),
        other => ExporterError::Other(format!("{context}: {other}")),
    }
}
