//! Login-url command implementation
//!
//! Prints a PKCE authorization URL together with the verifier and state the
//! caller must keep. With `--code`, exchanges the returned authorization code
//! for an access token instead.

use crate::adapters::api::HttpTransport;
use crate::auth::{authorize_url, exchange_code, PkceChallenge};
use crate::cli::Cli;
use clap::Args;

/// Arguments for the login-url command
#[derive(Args, Debug)]
pub struct LoginUrlArgs {
    /// Authorization code returned to the redirect URI
    #[arg(long, requires = "verifier")]
    pub code: Option<String>,

    /// Verifier printed when the URL was generated
    #[arg(long)]
    pub verifier: Option<String>,
}

impl LoginUrlArgs {
    /// Execute the login-url command
    pub async fn execute(&self, cli: &Cli) -> anyhow::Result<i32> {
        let config = match cli.load_config() {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        if let (Some(code), Some(verifier)) = (&self.code, &self.verifier) {
            let transport = HttpTransport::new(&config.credentials)?;
            return match exchange_code(transport.client(), &config.credentials, code, verifier).await {
                Ok(credential) => {
                    println!("access_token: {}", credential.expose_token());
                    println!("token_type:   {}", credential.token_type());
                    if let Some(expires_at) = credential.expires_at() {
                        println!("expires_at:   {}", expires_at.to_rfc3339());
                    }
                    Ok(0)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Authorization code exchange failed");
                    eprintln!("Login failed: {e}");
                    Ok(5)
                }
            };
        }

        let pkce = PkceChallenge::generate();
        match authorize_url(&config.credentials, &pkce) {
            Ok(url) => {
                println!("url:      {url}");
                println!("verifier: {}", pkce.verifier);
                println!("state:    {}", pkce.state);
                Ok(0)
            }
            Err(e) => {
                eprintln!("Configuration error: {e}");
                Ok(2)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_code_requires_verifier() {
        assert!(Cli::try_parse_from(["ode", "login-url", "--code", "abc"]).is_err());
        assert!(Cli::try_parse_from(["ode", "login-url", "--code", "abc", "--verifier", "v"]).is_ok());
    }
}
