//! API authentication: bearer credentials, token providers and PKCE login

pub mod credential;
pub mod pkce;

pub use credential::{BearerCredential, ClientCredentialsProvider, StaticTokenProvider, TokenProvider};
pub use pkce::{authorize_url, code_challenge, exchange_code, generate_code_verifier, PkceChallenge};
