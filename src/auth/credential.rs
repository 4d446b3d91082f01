//! Bearer credentials and the providers that mint them
//!
//! Request stages ask a [`TokenProvider`] for a [`BearerCredential`] before
//! every call. The client-credentials provider caches its token and fetches
//! a new one when the cached token is within 60 seconds of expiry.

use crate::config::{secret_string, CredentialsConfig, SecretString};
use crate::domain::{ExporterError, RequestError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;

/// Seconds before expiry at which a cached token is considered stale
const REFRESH_MARGIN_SECS: i64 = 60;

/// Access token plus its metadata
#[derive(Debug, Clone)]
pub struct BearerCredential {
    access_token: SecretString,
    token_type: String,
    expires_at: Option<DateTime<Utc>>,
    scopes: Option<Vec<String>>,
}

impl BearerCredential {
    /// Creates a credential with no known expiry or scopes
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: secret_string(access_token.into()),
            token_type: "bearer".to_string(),
            expires_at: None,
            scopes: None,
        }
    }

    /// Sets the expiry to `now + expires_in`; an unrepresentable expiry means none
    pub fn expiring_in(mut self, expires_in: Duration) -> Self {
        self.expires_at = ChronoDuration::from_std(expires_in)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d));
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = Some(scopes);
        self
    }

    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = token_type.into();
        self
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// True if the token has not expired at `at`; tokens with unknown expiry never expire
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| at < exp).unwrap_or(true)
    }

    pub fn is_expired(&self) -> bool {
        !self.is_valid_at(Utc::now())
    }

    /// Whether the credential grants `scope`
    ///
    /// A credential whose scopes were never reported is assumed to carry
    /// every scope; the API rejects the call if it does not.
    pub fn has_scope(&self, scope: &str) -> bool {
        match &self.scopes {
            Some(scopes) => scopes.iter().any(|s| s == scope),
            None => true,
        }
    }

    /// Value for the `Authorization` header
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret().as_str())
    }

    pub fn expose_token(&self) -> &str {
        self.access_token.expose_secret().as_str()
    }
}

/// Supplies a valid credential on demand
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a credential that is valid now
    async fn credential(&self) -> Result<BearerCredential>;
}

/// Hands out one fixed credential and fails once it has expired
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    credential: BearerCredential,
}

impl StaticTokenProvider {
    pub fn new(credential: BearerCredential) -> Self {
        Self { credential }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn credential(&self) -> Result<BearerCredential> {
        if self.credential.is_expired() {
            return Err(ExporterError::Authentication(
                "Access token has expired; supply a new one".to_string(),
            ));
        }
        Ok(self.credential.clone())
    }
}

/// OAuth token endpoint response
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    #[serde(default)]
    pub(crate) token_type: Option<String>,
    #[serde(default)]
    pub(crate) expires_in: Option<u64>,
    #[serde(default)]
    pub(crate) scope: Option<String>,
}

impl TokenResponse {
    pub(crate) fn into_credential(self) -> BearerCredential {
        let mut credential = BearerCredential::new(self.access_token);
        if let Some(token_type) = self.token_type {
            credential = credential.with_token_type(token_type);
        }
        if let Some(expires_in) = self.expires_in {
            credential = credential.expiring_in(Duration::from_secs(expires_in));
        }
        if let Some(scope) = self.scope {
            credential =
                credential.with_scopes(scope.split_whitespace().map(str::to_string).collect());
        }
        credential
    }
}

/// Reads a token endpoint response, mapping failures to request errors
pub(crate) async fn read_token_response(response: reqwest::Response) -> Result<BearerCredential> {
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(RequestError::AuthenticationFailed(format!(
            "Token request failed with status {status}: {error_text}"
        ))
        .into());
    }

    let token_response: TokenResponse = response.json().await.map_err(|e| {
        RequestError::InvalidResponse(format!("Failed to parse token response: {e}"))
    })?;
    Ok(token_response.into_credential())
}

/// Client-credentials grant against `<login>/oauth/token`
pub struct ClientCredentialsProvider {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    cached: Mutex<Option<BearerCredential>>,
}

impl ClientCredentialsProvider {
    /// Creates a provider from the credentials block
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the client id or secret is missing
    pub fn from_config(config: &CredentialsConfig) -> Result<Self> {
        let client_id = config
            .client_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                ExporterError::Configuration("credentials.clientId is required".to_string())
            })?;
        let client_secret = config
            .client_secret
            .clone()
            .filter(|s| !s.expose_secret().is_blank())
            .ok_or_else(|| {
                ExporterError::Configuration("credentials.clientSecret is required".to_string())
            })?;

        let client = ClientBuilder::new()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ExporterError::Other(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            token_url: format!("{}/oauth/token", config.login_base_url()),
            client_id,
            client_secret,
            cached: Mutex::new(None),
        })
    }

    async fn fetch_token(&self) -> Result<BearerCredential> {
        tracing::debug!(
            token_url = %self.token_url,
            client_id = %self.client_id,
            "Requesting access token with client credentials grant"
        );

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret().as_str()))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RequestError::Timeout(format!("Token request timed out: {e}"))
                } else {
                    RequestError::ConnectionFailed(format!("Failed to request token: {e}"))
                }
            })?;

        let credential = read_token_response(response).await?;

        tracing::info!(
            expires_at = ?credential.expires_at(),
            "Acquired access token"
        );
        Ok(credential)
    }
}

#[async_trait]
impl TokenProvider for ClientCredentialsProvider {
    async fn credential(&self) -> Result<BearerCredential> {
        let mut cached = self.cached.lock().await;

        let refresh_at = Utc::now() + ChronoDuration::seconds(REFRESH_MARGIN_SECS);
        if let Some(credential) = cached.as_ref() {
            if credential.is_valid_at(refresh_at) {
                return Ok(credential.clone());
            }
            tracing::debug!("Cached access token expiring soon, refreshing");
        }

        let credential = self.fetch_token().await?;
        *cached = Some(credential.clone());
        Ok(credential)
    }
}
