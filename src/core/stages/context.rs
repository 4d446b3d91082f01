//! Per-run render context shared by every stage

use crate::domain::{DataBag, ExporterError, JobPlan, Result, RunId};
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use handlebars::Handlebars;
use serde_json::{json, Map, Value};

/// Identity of the run plus the template engine
///
/// Every handlebars render (endpoints, query values, body strings,
/// templates, export settings) sees the same variables:
/// `{data, job: {key, name}, run: {id, startedAt}, customData, dates}`.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub run_id: RunId,
    pub job_key: String,
    pub job_name: String,
    pub started_at: DateTime<Utc>,
    pub custom_data: Map<String, Value>,
    engine: Handlebars<'static>,
}

impl StageContext {
    pub fn new(run_id: RunId, plan: &JobPlan, started_at: DateTime<Utc>) -> Self {
        let mut engine = Handlebars::new();
        engine.set_strict_mode(false);
        engine.register_escape_fn(handlebars::no_escape);

        Self {
            run_id,
            job_key: plan.key.clone(),
            job_name: plan.name.clone(),
            started_at,
            custom_data: plan.custom_data.clone(),
            engine,
        }
    }

    /// Template variables for the current DataBag contents
    pub fn variables(&self, bag: &DataBag) -> Value {
        json!({
            "data": bag.snapshot(),
            "job": { "key": self.job_key, "name": self.job_name },
            "run": {
                "id": self.run_id.to_string(),
                "startedAt": self.started_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            },
            "customData": Value::Object(self.custom_data.clone()),
            "dates": date_variables(self.started_at),
        })
    }

    /// Renders one template string
    pub fn render(&self, template: &str, variables: &Value) -> Result<String> {
        if !template.contains("{{") {
            return Ok(template.to_string());
        }
        self.engine
            .render_template(template, variables)
            .map_err(|e| ExporterError::Template(e.to_string()))
    }

    /// Renders every string leaf of a JSON value
    pub fn render_value(&self, value: &Value, variables: &Value) -> Result<Value> {
        Ok(match value {
            Value::String(s) => Value::String(self.render(s, variables)?),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.render_value(item, variables))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Object(map) => {
                let mut rendered = Map::with_capacity(map.len());
                for (k, v) in map {
                    rendered.insert(k.clone(), self.render_value(v, variables)?);
                }
                Value::Object(rendered)
            }
            other => other.clone(),
        })
    }
}

/// `{today, yesterday, yesterdayInterval, now}` in UTC
pub fn date_variables(at: DateTime<Utc>) -> Value {
    let today = at.date_naive();
    let yesterday = today - ChronoDuration::days(1);
    json!({
        "today": today.format("%Y-%m-%d").to_string(),
        "yesterday": yesterday.format("%Y-%m-%d").to_string(),
        "yesterdayInterval": format!(
            "{}T00:00:00.000Z/{}T00:00:00.000Z",
            yesterday.format("%Y-%m-%d"),
            today.format("%Y-%m-%d")
        ),
        "now": at.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}
