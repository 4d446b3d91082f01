//! Standard output sink

use super::{Artifact, ExportSink};
use crate::domain::ExportError;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone, Default)]
pub struct StdoutSink;

#[async_trait]
impl ExportSink for StdoutSink {
    fn kind(&self) -> &'static str {
        "stdout"
    }

    async fn deliver(&self, artifact: &Artifact) -> Result<String, ExportError> {
        let mut stdout = tokio::io::stdout();
        let mut content = artifact.content.clone();
        if !content.ends_with('\n') {
            content.push('\n');
        }
        stdout
            .write_all(content.as_bytes())
            .await
            .map_err(|e| ExportError::DeliveryFailed {
                sink: "stdout".to_string(),
                message: e.to_string(),
            })?;
        stdout.flush().await.map_err(|e| ExportError::DeliveryFailed {
            sink: "stdout".to_string(),
            message: e.to_string(),
        })?;
        Ok("stdout".to_string())
    }
}
