//! Export sinks
//!
//! An export stage renders its settings, builds a sink through
//! [`create_sink`] and hands it one [`Artifact`].

pub mod factory;
pub mod file;
pub mod http;
pub mod stdout;

use crate::domain::ExportError;
use async_trait::async_trait;
use serde_json::Value;

pub use factory::create_sink;
pub use file::FileSink;
pub use http::HttpSink;
pub use stdout::StdoutSink;

/// Rendered content ready for delivery
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// DataBag key the content came from
    pub name: String,
    pub content: String,
    pub content_type: &'static str,
}

impl Artifact {
    /// Strings are delivered as text; any other value as pretty-printed JSON
    pub fn from_value(name: impl Into<String>, value: &Value) -> Result<Self, ExportError> {
        let name = name.into();
        match value {
            Value::String(text) => Ok(Self {
                name,
                content: text.clone(),
                content_type: "text/plain; charset=utf-8",
            }),
            other => {
                let content = serde_json::to_string_pretty(other).map_err(|e| {
                    ExportError::DeliveryFailed {
                        sink: name.clone(),
                        message: format!("Failed to serialize artifact: {e}"),
                    }
                })?;
                Ok(Self {
                    name,
                    content,
                    content_type: "application/json",
                })
            }
        }
    }

    /// File extension matching the content type
    pub fn extension(&self) -> &'static str {
        if self.content_type == "application/json" {
            "json"
        } else {
            "txt"
        }
    }
}

/// Trait for export sinks
#[async_trait]
pub trait ExportSink: Send + Sync {
    /// Sink kind for logging
    fn kind(&self) -> &'static str;

    /// Delivers the artifact, returning a human-readable location
    async fn deliver(&self, artifact: &Artifact) -> Result<String, ExportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_artifact_from_string_is_text() {
        let artifact = Artifact::from_value("summary", &json!("hello")).unwrap();
        assert_eq!(artifact.content, "hello");
        assert_eq!(artifact.extension(), "txt");
    }

    #[test]
    fn test_artifact_from_object_is_json() {
        let artifact = Artifact::from_value("report", &json!({"a": 1})).unwrap();
        assert_eq!(artifact.content_type, "application/json");
        assert_eq!(artifact.extension(), "json");
        let parsed: Value = serde_json::from_str(&artifact.content).unwrap();
        assert_eq!(parsed, json!({"a": 1}));
    }
}
