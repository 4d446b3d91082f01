//! reqwest-backed [`ApiTransport`]

use super::transport::{ApiRequest, ApiTransport};
use crate::config::CredentialsConfig;
use crate::domain::{ExporterError, HttpMethod, RequestError, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, ClientBuilder, Method};
use serde_json::Value;
use std::time::Duration;

/// HTTP transport over a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds the client with the configured per-call timeout
    pub fn new(config: &CredentialsConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ExporterError::Other(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

pub(crate) fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> std::result::Result<Value, RequestError> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &request.url)
            .header("Accept", "application/json");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(auth) = &request.authorization {
            builder = builder.header(AUTHORIZATION, auth);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                RequestError::Timeout(format!("{} {}: {e}", request.method, request.url))
            } else {
                RequestError::ConnectionFailed(format!("{} {}: {e}", request.method, request.url))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let text = response.text().await.unwrap_or_default();

            return Err(match RequestError::from_status(status.as_u16(), text) {
                RequestError::RateLimited { .. } => RequestError::RateLimited { retry_after },
                other => other,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RequestError::InvalidResponse(format!("Failed to read body: {e}")))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| RequestError::InvalidResponse(format!("Response is not JSON: {e}")))
    }
}
