//! Export sink factory

use super::{ExportSink, FileSink, HttpSink, StdoutSink};
use crate::domain::{ExportDef, ExportError, HttpMethod, SinkKind};
use reqwest::Client;

/// Create a sink for an export whose settings are already rendered
///
/// # Errors
///
/// Returns [`ExportError::UnsupportedSink`] when required settings are missing
/// or the HTTP method is not POST/PUT.
pub fn create_sink(def: &ExportDef, client: &Client) -> Result<Box<dyn ExportSink>, ExportError> {
    match def.sink {
        SinkKind::File => {
            let destination = def.destination.clone().ok_or_else(|| {
                ExportError::UnsupportedSink(format!("export '{}' has no destination", def.name))
            })?;
            Ok(Box::new(FileSink::new(destination, def.filename.clone())))
        }
        SinkKind::Http => {
            let url = def.url.clone().ok_or_else(|| {
                ExportError::UnsupportedSink(format!("export '{}' has no url", def.name))
            })?;
            let method = def.method.unwrap_or(HttpMethod::Post);
            if !matches!(method, HttpMethod::Post | HttpMethod::Put) {
                return Err(ExportError::UnsupportedSink(format!(
                    "export '{}' uses {method}; http sinks support POST and PUT",
                    def.name
                )));
            }
            Ok(Box::new(HttpSink::new(
                client.clone(),
                url,
                method,
                def.headers.clone(),
            )))
        }
        SinkKind::Stdout => Ok(Box::new(StdoutSink)),
    }
}
