//! Pipeline stages
//!
//! Each stage reads and writes the run's [`DataBag`](crate::domain::DataBag)
//! by stage name. A job runs its request stages, then transforms, then
//! templates, then exports, in the order the job lists them.

pub mod context;
pub mod export;
pub mod request;
pub mod template;
pub mod transform;

pub use context::{date_variables, StageContext};
pub use export::ExportStage;
pub use request::RequestStage;
pub use template::render_template;
pub use transform::TransformStage;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four stage kinds, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Request,
    Transform,
    Template,
    Export,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Request => "request",
            StageKind::Transform => "transform",
            StageKind::Template => "template",
            StageKind::Export => "export",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
