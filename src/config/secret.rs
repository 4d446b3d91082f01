//! Secret values read from configuration
//!
//! Client secrets and bearer tokens are held as [`SecretString`]. The value
//! is zeroed on drop, `Debug` prints a redaction marker, and reading it takes
//! an explicit `expose_secret()`.
//!
//! # Example
//!
//! ```rust
//! use open_data_exporter::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let client_secret = secret_string("s3cr3t".to_string());
//! assert_eq!(client_secret.expose_secret().as_str(), "s3cr3t");
//! assert!(!format!("{client_secret:?}").contains("s3cr3t"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, ExposeSecret, Secret, SerializableSecret};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Plain string payload of a [`SecretString`]
///
/// Serializes as the bare string so configuration files stay readable.
#[derive(Clone, Debug, Zeroize, Serialize, Deserialize)]
#[zeroize(drop)]
#[serde(transparent)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl SecretValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Secret-wrapped string used for credentials
pub type SecretString = Secret<SecretValue>;

pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue(value))
}

pub fn secret_string_opt(value: Option<String>) -> Option<SecretString> {
    value.map(secret_string)
}

/// True when the secret is missing or blank
pub fn is_blank_secret(value: Option<&SecretString>) -> bool {
    value.map_or(true, |s| s.expose_secret().is_blank())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_detection() {
        assert!(is_blank_secret(None));
        assert!(is_blank_secret(Some(&secret_string("  ".to_string()))));
        assert!(!is_blank_secret(Some(&secret_string("abc".to_string()))));
        assert!(secret_string_opt(None).is_none());
    }

    #[test]
    fn test_debug_is_redacted() {
        let secret = secret_string("client-secret-value".to_string());
        let debug_output = format!("{secret:?}");
        assert!(!debug_output.contains("client-secret-value"));
    }

    #[test]
    fn test_deserializes_from_bare_string() {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Credentials {
            client_secret: SecretString,
        }

        let creds: Credentials = serde_json::from_str(r#"{"clientSecret": "abc123"}"#).unwrap();
        assert_eq!(creds.client_secret.expose_secret(), "abc123");

        let json = serde_json::to_string(&secret_string("abc123".to_string())).unwrap();
        assert_eq!(json, "\"abc123\"");
    }
}
