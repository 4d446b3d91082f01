//! Job and stage definitions
//!
//! These types are deserialized straight from the configuration file. A
//! [`JobSpec`] only names its stages; [`JobPlan`] is the owned, fully
//! resolved copy a runner executes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Immutable job definition as configured under `jobs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    /// Key the job is registered under (filled in from the map key on load)
    #[serde(skip)]
    pub key: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Cron expression; `None` means the job only runs on demand
    #[serde(default)]
    pub cron: Option<String>,

    /// Request stage names, in execution order
    #[serde(default)]
    pub requests: Vec<String>,

    /// Transform stage names, in execution order
    #[serde(default)]
    pub transforms: Vec<String>,

    /// Template stage names, in execution order
    #[serde(default)]
    pub templates: Vec<String>,

    /// Export stage names, in execution order
    #[serde(default)]
    pub exports: Vec<String>,

    /// Named configurations whose `customData` is merged into template variables
    #[serde(default)]
    pub configurations: Vec<String>,
}

impl JobSpec {
    /// Display name, falling back to the key when unnamed
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.key
        } else {
            &self.name
        }
    }
}

/// HTTP method of a request or HTTP export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    #[serde(alias = "get")]
    Get,
    #[serde(alias = "post")]
    Post,
    #[serde(alias = "put")]
    Put,
    #[serde(alias = "patch")]
    Patch,
    #[serde(alias = "delete")]
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// How a request walks through multiple result pages
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Pagination {
    /// Single call
    #[default]
    None,

    /// `pageNumber`/`pageSize` query parameters, stop at `pageCount`
    #[serde(rename_all = "camelCase")]
    PageNumber {
        #[serde(default = "default_page_size")]
        page_size: u32,
        #[serde(default = "default_entities_field")]
        items_field: String,
        #[serde(default = "default_max_pages")]
        max_pages: u32,
    },

    /// `paging: {pageSize, pageNumber}` in the request body, stop on a short page
    #[serde(rename_all = "camelCase")]
    BodyPaging {
        #[serde(default = "default_page_size")]
        page_size: u32,
        #[serde(default = "default_conversations_field")]
        items_field: String,
        #[serde(default = "default_max_pages")]
        max_pages: u32,
    },
}

/// A named retrieval against the remote API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDef {
    /// Stage name; the result lands in the DataBag under this key
    #[serde(skip)]
    pub name: String,

    #[serde(default, alias = "type")]
    pub method: HttpMethod,

    /// Endpoint template, relative to the API base URL or absolute
    #[serde(alias = "uri")]
    pub endpoint: String,

    /// Query parameters (values are templates)
    #[serde(default)]
    pub query: BTreeMap<String, String>,

    /// Request body; string leaves are templates
    #[serde(default)]
    pub body: Option<Value>,

    #[serde(default)]
    pub pagination: Pagination,

    /// OAuth scope the credential must carry
    #[serde(default)]
    pub required_scope: Option<String>,
}

/// Whether a transform is built in or provided by a registered extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    #[default]
    Builtin,
    Extension,
}

/// A named transform over the DataBag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformDef {
    #[serde(skip)]
    pub name: String,

    #[serde(default, alias = "type")]
    pub kind: TransformKind,

    /// Extension name (for `kind = extension`)
    #[serde(default)]
    pub extension: Option<String>,

    /// Function within the extension, or the builtin transform name
    #[serde(default)]
    pub function: Option<String>,

    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl TransformDef {
    /// Registry key of the extension function this transform calls
    ///
    /// `extension = "a"` + `function = "b"` resolves to `"a.b"`; an extension
    /// given already dotted is used as is.
    pub fn extension_ref(&self) -> Option<String> {
        let extension = self.extension.as_deref()?.trim();
        match self.function.as_deref().map(str::trim) {
            Some(function) if !function.is_empty() => Some(format!("{extension}.{function}")),
            _ => Some(extension.to_string()),
        }
    }
}

/// Output format of a rendered template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFormat {
    #[default]
    Text,
    Json,
}

/// A named view rendered from the DataBag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDef {
    #[serde(skip)]
    pub name: String,

    /// Inline template text
    #[serde(default)]
    pub template: Option<String>,

    /// Path to a template file, relative to the configuration file
    #[serde(default)]
    pub template_file: Option<PathBuf>,

    /// DataBag key for the rendered artifact (defaults to the template name)
    #[serde(default)]
    pub target: Option<String>,

    #[serde(default)]
    pub format: TemplateFormat,
}

impl TemplateDef {
    /// DataBag key the rendered artifact is written to
    pub fn target_key(&self) -> &str {
        self.target.as_deref().unwrap_or(&self.name)
    }
}

/// Sink kind of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    File,
    Http,
    Stdout,
}

/// A named delivery of an artifact to a sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDef {
    #[serde(skip)]
    pub name: String,

    #[serde(rename = "type")]
    pub sink: SinkKind,

    /// DataBag key of the artifact to deliver
    #[serde(alias = "template")]
    pub source: String,

    /// Output directory (file sink)
    #[serde(default)]
    pub destination: Option<String>,

    /// Output file name template (file sink)
    #[serde(default)]
    pub filename: Option<String>,

    /// Target URL (http sink)
    #[serde(default)]
    pub url: Option<String>,

    /// HTTP method (http sink, default POST)
    #[serde(default)]
    pub method: Option<HttpMethod>,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Named bundle of template variables a job can opt into
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationDef {
    #[serde(default)]
    pub custom_data: Map<String, Value>,
}

/// Fully resolved, owned copy of a job
///
/// Built from a [`JobSpec`] at run start; holds clones of every stage
/// definition so a run never borrows from the shared configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct JobPlan {
    pub key: String,
    pub name: String,
    pub requests: Vec<RequestDef>,
    pub transforms: Vec<TransformDef>,
    pub templates: Vec<TemplateDef>,
    pub exports: Vec<ExportDef>,
    /// Top-level `customData` with the job's configurations merged over it
    pub custom_data: Map<String, Value>,
}

fn default_page_size() -> u32 {
    100
}

fn default_max_pages() -> u32 {
    100
}

fn default_entities_field() -> String {
    "entities".to_string()
}

fn default_conversations_field() -> String {
    "conversations".to_string()
}
