//! Domain identifier types with validation
//!
//! Newtype wrappers so job keys and run identifiers cannot be mixed up with
//! each other or with arbitrary strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Job key newtype wrapper
///
/// The key a job is registered under in the `jobs` configuration map.
///
/// # Examples
///
/// ```
/// use open_data_exporter::domain::ids::JobKey;
/// use std::str::FromStr;
///
/// let key = JobKey::from_str("daily_report").unwrap();
/// assert_eq!(key.as_str(), "daily_report");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobKey(String);

impl JobKey {
    /// Creates a new JobKey from a string
    ///
    /// Returns `Err` if the key is empty or contains a comma (job lists are
    /// passed comma-separated on the command line).
    pub fn new(key: impl Into<String>) -> Result<Self, String> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err("Job key cannot be empty".to_string());
        }
        if trimmed.contains(',') {
            return Err(format!("Job key cannot contain ',': {trimmed}"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the job key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for JobKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque run identifier
///
/// Assigned when a run (or a triggered batch of runs) starts and used only
/// to correlate output and log lines for that run. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a fresh random run identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| format!("Invalid run id '{s}': {e}"))
    }
}
