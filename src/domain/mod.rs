//! Domain models and types for the exporter.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`JobKey`], [`RunId`])
//! - **Job and stage definitions** ([`JobSpec`], [`RequestDef`], [`TransformDef`],
//!   [`TemplateDef`], [`ExportDef`]) and the owned, resolved [`JobPlan`]
//! - **The per-run store** ([`DataBag`])
//! - **Error types** ([`ExporterError`], [`RequestError`], [`TransformError`], [`ExportError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, ExporterError>`]:
//!
//! ```rust
//! use open_data_exporter::domain::{ExporterError, Result};
//!
//! fn example() -> Result<()> {
//!     // Errors are automatically converted using the ? operator
//!     let config = open_data_exporter::config::load_config("config.json")?;
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod databag;
pub mod errors;
pub mod ids;
pub mod job;
pub mod result;

// Re-export commonly used types for convenience
pub use context::ResultExt;
pub use databag::DataBag;
pub use errors::{ExportError, ExporterError, RequestError, TransformError};
pub use ids::{JobKey, RunId};
pub use job::{
    ConfigurationDef, ExportDef, HttpMethod, JobPlan, JobSpec, Pagination, RequestDef, SinkKind,
    TemplateDef, TemplateFormat, TransformDef, TransformKind,
};
pub use result::Result;
