//! External system integrations.
//!
//! - [`api`] - Remote analytics API transport (trait + reqwest implementation)
//! - [`sinks`] - Export destinations (file, HTTP, stdout)
//!
//! Both sides are trait objects so the engine can be tested with fakes:
//!
//! ```rust
//! use open_data_exporter::adapters::sinks::Artifact;
//! use serde_json::json;
//!
//! let artifact = Artifact::from_value("report", &json!({"offered": 3})).unwrap();
//! assert_eq!(artifact.extension(), "json");
//! ```

pub mod api;
pub mod sinks;
