//! Transform stage: builtin reshaping or a registered extension function

use crate::core::extensions::{param_str, ExtensionRegistry};
use crate::domain::{DataBag, Result, TransformDef, TransformError, TransformKind};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Applies transforms against the run's DataBag
#[derive(Debug, Clone)]
pub struct TransformStage {
    extensions: Arc<ExtensionRegistry>,
}

impl TransformStage {
    pub fn new(extensions: Arc<ExtensionRegistry>) -> Self {
        Self { extensions }
    }

    pub fn execute(&self, def: &TransformDef, bag: &mut DataBag) -> Result<()> {
        match def.kind {
            TransformKind::Extension => {
                let name = def
                    .extension_ref()
                    .ok_or_else(|| TransformError::UnknownExtension(def.name.clone()))?;
                tracing::debug!(stage = %def.name, extension = %name, "Invoking extension");
                self.extensions.invoke(&name, bag, &def.parameters)?;
            }
            TransformKind::Builtin => {
                let builtin = def.function.as_deref().unwrap_or_default();
                apply_builtin(builtin, bag, &def.parameters)?;
            }
        }
        Ok(())
    }
}

fn apply_builtin(
    name: &str,
    bag: &mut DataBag,
    params: &Map<String, Value>,
) -> std::result::Result<(), TransformError> {
    match name {
        "copy" => {
            let value = required_input(bag, params, "from")?.clone();
            bag.insert(target(params)?, value);
        }
        "pluck" => {
            let source = required_input(bag, params, "from")?;
            let pointer = param_str(params, "pointer", "");
            let value = source.pointer(&pointer).cloned().unwrap_or(Value::Null);
            bag.insert(target(params)?, value);
        }
        "flatten" => {
            let separator = param_str(params, "separator", "_");
            let value = match required_input(bag, params, "from")? {
                Value::Array(items) => Value::Array(
                    items.iter().map(|item| flatten_value(item, &separator)).collect(),
                ),
                other => flatten_value(other, &separator),
            };
            bag.insert(target(params)?, value);
        }
        "merge" => {
            let sources = params
                .get("sources")
                .and_then(Value::as_array)
                .ok_or_else(|| TransformError::InvalidInput("merge needs a 'sources' array".into()))?;

            let mut merged = Map::new();
            for source in sources.iter().filter_map(Value::as_str) {
                match bag.get(source) {
                    Some(Value::Object(fields)) => {
                        merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())))
                    }
                    Some(_) => {
                        return Err(TransformError::InvalidInput(format!(
                            "merge source '{source}' is not an object"
                        )))
                    }
                    None => tracing::debug!(source, "merge source missing, skipped"),
                }
            }
            bag.insert(target(params)?, Value::Object(merged));
        }
        other => return Err(TransformError::UnknownBuiltin(other.to_string())),
    }
    Ok(())
}

fn required_input<'a>(
    bag: &'a DataBag,
    params: &Map<String, Value>,
    key: &str,
) -> std::result::Result<&'a Value, TransformError> {
    let name = param_str(params, key, "");
    if name.is_empty() {
        return Err(TransformError::InvalidInput(format!("missing parameter '{key}'")));
    }
    bag.get(&name)
        .ok_or_else(|| TransformError::InvalidInput(format!("'{name}' is not in the data bag")))
}

fn target(params: &Map<String, Value>) -> std::result::Result<String, TransformError> {
    let to = param_str(params, "to", "");
    if to.is_empty() {
        Err(TransformError::InvalidInput("missing parameter 'to'".into()))
    } else {
        Ok(to)
    }
}

/// Nested objects become single-level keys joined by `separator`
///
/// `{"a": {"b": 1}, "c": [1]}` → `{"a_b": 1, "c": [1]}`. Arrays are leaves.
fn flatten_value(value: &Value, separator: &str) -> Value {
    match value {
        Value::Object(map) => {
            let mut fields = Map::new();
            flatten_into(&mut fields, None, map, separator);
            Value::Object(fields)
        }
        other => other.clone(),
    }
}

fn flatten_into(out: &mut Map<String, Value>, prefix: Option<&str>, map: &Map<String, Value>, separator: &str) {
    for (key, value) in map {
        let path = match prefix {
            Some(prefix) => format!("{prefix}{separator}{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => {
                flatten_into(out, Some(&path), inner, separator)
            }
            leaf => {
                out.insert(path, leaf.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn builtin(function: &str, parameters: Value) -> TransformDef {
        TransformDef {
            name: function.to_string(),
            kind: TransformKind::Builtin,
            extension: None,
            function: Some(function.to_string()),
            parameters: parameters.as_object().cloned().unwrap_or_default(),
        }
    }

    fn stage() -> TransformStage {
        TransformStage::new(Arc::new(ExtensionRegistry::with_defaults()))
    }

    #[test]
    fn test_copy() {
        let mut bag = DataBag::new();
        bag.insert("a", json!({"x": 1}));
        stage()
            .execute(&builtin("copy", json!({"from": "a", "to": "b"})), &mut bag)
            .unwrap();
        assert_eq!(bag.get("b"), Some(&json!({"x": 1})));
        assert_eq!(bag.get("a"), Some(&json!({"x": 1})));
    }

    #[test]
    fn test_pluck_missing_pointer_is_null() {
        let mut bag = DataBag::new();
        bag.insert("a", json!({"entities": [{"id": "q1"}]}));
        let stage = stage();

        stage
            .execute(
                &builtin("pluck", json!({"from": "a", "pointer": "/entities/0/id", "to": "first"})),
                &mut bag,
            )
            .unwrap();
        stage
            .execute(
                &builtin("pluck", json!({"from": "a", "pointer": "/nope", "to": "none"})),
                &mut bag,
            )
            .unwrap();

        assert_eq!(bag.get("first"), Some(&json!("q1")));
        assert_eq!(bag.get("none"), Some(&Value::Null));
    }

    #[test]
    fn test_flatten_nested_objects() {
        let mut bag = DataBag::new();
        bag.insert(
            "conv",
            json!([{"queue": {"id": "q1", "name": "Sales"}, "tags": ["a"], "empty": {}}]),
        );
        stage()
            .execute(&builtin("flatten", json!({"from": "conv", "to": "flat", "separator": "."})), &mut bag)
            .unwrap();
        assert_eq!(
            bag.get("flat"),
            Some(&json!([{"queue.id": "q1", "queue.name": "Sales", "tags": ["a"], "empty": {}}]))
        );
    }

    #[test]
    fn test_merge_later_wins() {
        let mut bag = DataBag::new();
        bag.insert("a", json!({"x": 1, "y": 1}));
        bag.insert("b", json!({"y": 2}));
        stage()
            .execute(&builtin("merge", json!({"sources": ["a", "missing", "b"], "to": "m"})), &mut bag)
            .unwrap();
        assert_eq!(bag.get("m"), Some(&json!({"x": 1, "y": 2})));
    }

    #[test]
    fn test_missing_input_is_invalid() {
        let mut bag = DataBag::new();
        let err = stage()
            .execute(&builtin("copy", json!({"from": "nope", "to": "b"})), &mut bag)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::domain::ExporterError::Transform(TransformError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_unknown_builtin() {
        let mut bag = DataBag::new();
        let err = stage()
            .execute(&builtin("explode", json!({})), &mut bag)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::domain::ExporterError::Transform(TransformError::UnknownBuiltin(n)) if n == "explode"
        ));
    }

    #[test]
    fn test_extension_dispatch() {
        let mut bag = DataBag::new();
        bag.insert("get_queues", json!({"entities": [{"id": "q1", "name": "Sales"}]}));
        let def = TransformDef {
            name: "flatten_queues".to_string(),
            kind: TransformKind::Extension,
            extension: Some("daily_conversation_report_card".to_string()),
            function: Some("flattenQueueData".to_string()),
            parameters: Map::new(),
        };
        stage().execute(&def, &mut bag).unwrap();
        assert_eq!(bag.get("queues"), Some(&json!({"q1": {"id": "q1", "name": "Sales"}})));
    }

    #[test]
    fn test_unknown_extension() {
        let mut bag = DataBag::new();
        let def = TransformDef {
            name: "t".to_string(),
            kind: TransformKind::Extension,
            extension: Some("nope".to_string()),
            function: Some("fn".to_string()),
            parameters: Map::new(),
        };
        assert!(matches!(
            stage().execute(&def, &mut bag),
            Err(crate::domain::ExporterError::Transform(TransformError::UnknownExtension(_)))
        ));
    }
}
