//! HTTP sink: POST/PUT the artifact to a URL

use super::{Artifact, ExportSink};
use crate::adapters::api::http::to_reqwest_method;
use crate::domain::{ExportError, HttpMethod};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct HttpSink {
    client: Client,
    url: String,
    method: HttpMethod,
    headers: BTreeMap<String, String>,
}

impl HttpSink {
    pub fn new(
        client: Client,
        url: impl Into<String>,
        method: HttpMethod,
        headers: BTreeMap<String, String>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            method,
            headers,
        }
    }
}

#[async_trait]
impl ExportSink for HttpSink {
    fn kind(&self) -> &'static str {
        "http"
    }

    async fn deliver(&self, artifact: &Artifact) -> Result<String, ExportError> {
        let mut request = self
            .client
            .request(to_reqwest_method(self.method), &self.url)
            .header(CONTENT_TYPE, artifact.content_type)
            .body(artifact.content.clone());
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| ExportError::DeliveryFailed {
            sink: self.url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ExportError::DeliveryFailed {
                sink: self.url.clone(),
                message: format!("status {status}: {text}"),
            });
        }

        Ok(format!("{} {}", self.method, self.url))
    }
}
