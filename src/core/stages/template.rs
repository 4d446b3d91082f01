//! Template stage: renders a named view of the DataBag

use super::context::StageContext;
use crate::domain::{DataBag, ExporterError, Result, ResultExt, TemplateDef, TemplateFormat};
use serde_json::Value;

/// Renders `def` and writes the artifact to `bag[def.target_key()]`
///
/// Text templates produce a string value. `json` templates are parsed, so a
/// later export sees structured data.
pub async fn render_template(def: &TemplateDef, bag: &mut DataBag, ctx: &StageContext) -> Result<()> {
    let source = match (&def.template, &def.template_file) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .map_err(ExporterError::from)
            .with_context(|| format!("Failed to read template file {}", path.display()))?,
        (None, None) => {
            return Err(ExporterError::Template(format!(
                "template '{}' has neither template nor templateFile",
                def.name
            )))
        }
    };

    let variables = ctx.variables(bag);
    let rendered = ctx
        .render(&source, &variables)
        .with_context(|| format!("Failed to render template {}", def.name))?;

    let artifact = match def.format {
        TemplateFormat::Text => Value::String(rendered),
        TemplateFormat::Json => serde_json::from_str(&rendered).map_err(|e| {
            ExporterError::Template(format!("template '{}' did not render valid JSON: {e}", def.name))
        })?,
    };

    tracing::debug!(stage = %def.name, target = def.target_key(), "Template rendered");
    bag.insert(def.target_key(), artifact);
    Ok(())
}
