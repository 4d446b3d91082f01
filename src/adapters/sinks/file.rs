//! Local file sink

use super::{Artifact, ExportSink};
use crate::domain::ExportError;
use async_trait::async_trait;
use std::path::PathBuf;

/// Writes the artifact to `<directory>/<filename>`, creating the directory
#[derive(Debug, Clone)]
pub struct FileSink {
    directory: PathBuf,
    filename: Option<String>,
}

impl FileSink {
    pub fn new(directory: impl Into<PathBuf>, filename: Option<String>) -> Self {
        Self {
            directory: directory.into(),
            filename,
        }
    }

    /// Target path; without a configured filename, `<artifact>.<ext>`
    pub fn path_for(&self, artifact: &Artifact) -> PathBuf {
        let filename = match &self.filename {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("{}.{}", artifact.name, artifact.extension()),
        };
        self.directory.join(filename)
    }
}

#[async_trait]
impl ExportSink for FileSink {
    fn kind(&self) -> &'static str {
        "file"
    }

    async fn deliver(&self, artifact: &Artifact) -> Result<String, ExportError> {
        let path = self.path_for(artifact);
        let failed = |message: String| ExportError::DeliveryFailed {
            sink: path.display().to_string(),
            message,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| failed(format!("Failed to create directory: {e}")))?;
        }
        tokio::fs::write(&path, artifact.content.as_bytes())
            .await
            .map_err(|e| failed(format!("Failed to write file: {e}")))?;

        tracing::debug!(path = %path.display(), bytes = artifact.content.len(), "Wrote export file");
        Ok(path.display().to_string())
    }
}
