//! CLI command implementations
//!
//! Every command returns its process exit code: 0 success, 1 some jobs
//! failed, 2 configuration error, 5 fatal error.

pub mod init;
pub mod list_jobs;
pub mod login_url;
pub mod run;
pub mod validate;
