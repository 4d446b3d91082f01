//! API transport trait
//!
//! Request stages talk to the remote analytics API only through
//! [`ApiTransport`], so tests can swap in canned responses.

use crate::domain::{HttpMethod, RequestError};
use async_trait::async_trait;
use serde_json::Value;

/// One fully rendered call against the remote API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,

    /// Absolute URL
    pub url: String,

    pub query: Vec<(String, String)>,

    pub body: Option<Value>,

    /// `Authorization` header value, if any
    pub authorization: Option<String>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
            authorization: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }
}

/// Trait for API transports
///
/// Implementations perform exactly one HTTP exchange per call; retries and
/// pagination live in the request stage.
///
/// # Errors
///
/// Non-2xx responses map through [`RequestError::from_status`]; a 2xx body
/// that is not JSON is [`RequestError::InvalidResponse`].
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Sends the request and returns the decoded JSON body (`Null` when empty)
    async fn send(&self, request: &ApiRequest) -> std::result::Result<Value, RequestError>;
}
