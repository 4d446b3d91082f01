//! Remote analytics API access

pub mod http;
pub mod transport;

pub use http::HttpTransport;
pub use transport::{ApiRequest, ApiTransport};
