//! Core engine of the exporter.
//!
//! # Modules
//!
//! - [`stages`] - Request, transform, template and export stages
//! - [`extensions`] - Registry of named transform functions, plus the bundled report card
//! - [`pipeline`] - Job runner and run results
//! - [`scheduler`] - Cron timers that trigger runs
//! - [`runs`] - Registry of in-flight triggered batches
//! - [`exporter`] - Facade that wires it all together
//!
//! # Run Workflow
//!
//! 1. **Resolve**: Clone the job's stage definitions into an owned plan
//! 2. **Request**: Call the API, paging and retrying as configured
//! 3. **Transform**: Reshape the DataBag with builtins or extensions
//! 4. **Template**: Render artifacts from the DataBag
//! 5. **Export**: Deliver artifacts to file, HTTP or stdout sinks
//! 6. **Report**: Log a run summary and drop the DataBag
//!
//! # Example
//!
//! ```rust,no_run
//! use open_data_exporter::auth::ClientCredentialsProvider;
//! use open_data_exporter::config::load_config;
//! use open_data_exporter::core::Exporter;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("exporter.json")?;
//! let tokens = Arc::new(ClientCredentialsProvider::from_config(&config.credentials)?);
//! let exporter = Exporter::from_config(config, tokens)?;
//!
//! for result in exporter.run_now(&[]).await {
//!     println!("{}: success={}", result.job_key, result.is_success());
//! }
//! # Ok(())
//! # }
//! ```

pub mod exporter;
pub mod extensions;
pub mod pipeline;
pub mod runs;
pub mod scheduler;
pub mod stages;

pub use exporter::{Exporter, JobListing, RunHandle};
pub use pipeline::{JobExecutor, JobRunner, RunResult, RunStatus};
pub use runs::{RunLog, RunPoll, RunRegistry};
