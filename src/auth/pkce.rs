//! Authorization-code login with PKCE (RFC 7636)
//!
//! The exporter itself runs headless; this module only builds the authorize
//! URL a user opens in a browser and exchanges the returned code for a token.

use crate::auth::credential::{read_token_response, BearerCredential};
use crate::config::CredentialsConfig;
use crate::domain::{ExporterError, RequestError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use reqwest::Client;
use sha2::{Digest, Sha256};
use url::Url;

/// Verifier, challenge and state for one login attempt
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
    pub state: String,
}

impl PkceChallenge {
    /// Generates a fresh verifier/challenge pair and state
    pub fn generate() -> Self {
        let verifier = generate_code_verifier();
        let challenge = code_challenge(&verifier);
        Self {
            verifier,
            challenge,
            state: generate_state(),
        }
    }

    /// Checks the `state` echoed back on the redirect
    pub fn verify_state(&self, returned: &str) -> bool {
        !returned.is_empty() && self.state == returned
    }
}

/// 32 random bytes, base64url encoded without padding (43 characters)
pub fn generate_code_verifier() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 challenge: base64url(sha256(verifier))
pub fn code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

pub fn generate_state() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Builds `<login>/oauth/authorize?...` for the given challenge
pub fn authorize_url(config: &CredentialsConfig, pkce: &PkceChallenge) -> Result<Url> {
    let (client_id, redirect_uri) = login_params(config)?;

    let mut url = Url::parse(&format!("{}/oauth/authorize", config.login_base_url()))
        .map_err(|e| ExporterError::Configuration(format!("Invalid login URL: {e}")))?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("code_challenge", &pkce.challenge)
        .append_pair("code_challenge_method", "S256")
        .append_pair("state", &pkce.state);
    Ok(url)
}

/// Exchanges an authorization code for a credential
pub async fn exchange_code(
    client: &Client,
    config: &CredentialsConfig,
    code: &str,
    verifier: &str,
) -> Result<BearerCredential> {
    let (client_id, redirect_uri) = login_params(config)?;
    let token_url = format!("{}/oauth/token", config.login_base_url());

    tracing::debug!(token_url = %token_url, "Exchanging authorization code");

    let response = client
        .post(&token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", client_id),
            ("code_verifier", verifier),
        ])
        .send()
        .await
        .map_err(|e| RequestError::ConnectionFailed(format!("Failed to exchange code: {e}")))?;

    read_token_response(response).await
}

fn login_params(config: &CredentialsConfig) -> Result<(&str, &str)> {
    let client_id = config.client_id.as_deref().ok_or_else(|| {
        ExporterError::Configuration("credentials.clientId is required for login".to_string())
    })?;
    let redirect_uri = config.redirect_uri.as_deref().ok_or_else(|| {
        ExporterError::Configuration("credentials.redirectUri is required for login".to_string())
    })?;
    Ok((client_id, redirect_uri))
}
