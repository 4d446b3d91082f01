//! Export stage: delivers a DataBag artifact to a sink

use super::context::StageContext;
use crate::adapters::sinks::{create_sink, Artifact};
use crate::domain::{DataBag, ExportDef, ExportError, Result};
use reqwest::Client;
use std::collections::BTreeMap;

/// Export stage with the shared HTTP client used by http sinks
#[derive(Debug, Clone)]
pub struct ExportStage {
    client: Client,
}

impl ExportStage {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Renders the export settings, builds the sink and delivers
    ///
    /// Returns the sink's description of where the artifact went.
    pub async fn execute(&self, def: &ExportDef, bag: &DataBag, ctx: &StageContext) -> Result<String> {
        let value = bag
            .get(&def.source)
            .ok_or_else(|| ExportError::MissingArtifact(def.source.clone()))?;
        let artifact = Artifact::from_value(def.source.clone(), value)?;

        let variables = ctx.variables(bag);
        let render_opt = |field: &Option<String>| -> Result<Option<String>> {
            field
                .as_deref()
                .map(|s| ctx.render(s, &variables))
                .transpose()
        };

        let mut headers = BTreeMap::new();
        for (name, value) in &def.headers {
            headers.insert(name.clone(), ctx.render(value, &variables)?);
        }

        let rendered = ExportDef {
            destination: render_opt(&def.destination)?,
            filename: render_opt(&def.filename)?,
            url: render_opt(&def.url)?,
            headers,
            ..def.clone()
        };

        let sink = create_sink(&rendered, &self.client)?;
        let location = sink.deliver(&artifact).await?;

        tracing::info!(
            stage = %def.name,
            sink = sink.kind(),
            location = %location,
            bytes = artifact.content.len(),
            "Artifact exported"
        );
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExporterError, JobPlan, RunId};
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Map, Value};
    use tempfile::TempDir;

    fn context() -> StageContext {
        let plan = JobPlan {
            key: "daily".to_string(),
            name: "Daily".to_string(),
            requests: vec![],
            transforms: vec![],
            templates: vec![],
            exports: vec![],
            custom_data: Map::new(),
        };
        let at = Utc.with_ymd_and_hms(2024, 5, 2, 6, 0, 0).unwrap();
        StageContext::new(RunId::generate(), &plan, at)
    }

    fn export(value: Value) -> ExportDef {
        let mut def: ExportDef = serde_json::from_value(value).unwrap();
        def.name = "out".to_string();
        def
    }

    #[tokio::test]
    async fn test_file_export_renders_filename() {
        let temp = TempDir::new().unwrap();
        let mut bag = DataBag::new();
        bag.insert("summary", json!("hello"));

        let def = export(json!({
            "type": "file",
            "source": "summary",
            "destination": temp.path(),
            "filename": "{{job.key}}-{{dates.yesterday}}.txt"
        }));
        let location = ExportStage::new(Client::new())
            .execute(&def, &bag, &context())
            .await
            .unwrap();

        let expected = temp.path().join("daily-2024-05-01.txt");
        assert_eq!(location, expected.display().to_string());
        assert_eq!(std::fs::read_to_string(expected).unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_missing_artifact() {
        let def = export(json!({ "type": "stdout", "source": "nothing" }));
        let err = ExportStage::new(Client::new())
            .execute(&def, &DataBag::new(), &context())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExporterError::Export(ExportError::MissingArtifact(name)) if name == "nothing"
        ));
    }

    #[tokio::test]
    async fn test_http_export_renders_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/hook/daily")
            .match_header("x-job", "Daily")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::Json(json!({"offered": 4})))
            .with_status(204)
            .create_async()
            .await;

        let mut bag = DataBag::new();
        bag.insert("report", json!({"offered": 4}));

        let def = export(json!({
            "type": "http",
            "source": "report",
            "url": format!("{}/hook/{{{{job.key}}}}", server.url()),
            "method": "PUT",
            "headers": { "x-job": "{{job.name}}" }
        }));
        ExportStage::new(Client::new())
            .execute(&def, &bag, &context())
            .await
            .unwrap();

        mock.assert_async().await;
    }
}
