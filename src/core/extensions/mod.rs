//! Named transform functions
//!
//! An extension function receives the run's [`DataBag`] and the transform's
//! `parameters`, and may read and write only that bag. Functions are
//! registered under `"<extension>.<function>"`.
//!
//! ```
//! use open_data_exporter::core::extensions::ExtensionRegistry;
//! use open_data_exporter::domain::DataBag;
//! use serde_json::{json, Map};
//!
//! let mut registry = ExtensionRegistry::new();
//! registry.register("demo.stamp", |bag: &mut DataBag, _params: &Map<_, _>| {
//!     bag.insert("stamped", json!(true));
//!     Ok(())
//! });
//!
//! let mut bag = DataBag::new();
//! registry.invoke("demo.stamp", &mut bag, &Map::new()).unwrap();
//! assert_eq!(bag.get("stamped"), Some(&json!(true)));
//! ```

pub mod metrics;
pub mod report_card;

use crate::domain::{DataBag, TransformError};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Signature of a registered transform
pub type ExtensionFn =
    Arc<dyn Fn(&mut DataBag, &Map<String, Value>) -> Result<(), TransformError> + Send + Sync>;

/// Name → transform function
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    functions: HashMap<String, ExtensionFn>,
}

impl ExtensionRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bundled extensions
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        report_card::register(&mut registry);
        registry
    }

    /// Registers `function` under `name`, replacing any previous entry
    pub fn register<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&mut DataBag, &Map<String, Value>) -> Result<(), TransformError>
            + Send
            + Sync
            + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    pub fn get(&self, name: &str) -> Option<ExtensionFn> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Looks up and runs a function
    ///
    /// # Errors
    ///
    /// [`TransformError::UnknownExtension`] if nothing is registered under
    /// `name`, otherwise whatever the function returns.
    pub fn invoke(
        &self,
        name: &str,
        bag: &mut DataBag,
        params: &Map<String, Value>,
    ) -> Result<(), TransformError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| TransformError::UnknownExtension(name.to_string()))?;
        function(bag, params)
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

/// String parameter with a default
pub fn param_str(params: &Map<String, Value>, key: &str, default: &str) -> String {
    params
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_registered() {
        let registry = ExtensionRegistry::with_defaults();
        assert_eq!(
            registry.names(),
            vec![
                "daily_conversation_report_card.flattenQueueData".to_string(),
                "daily_conversation_report_card.prepareReport".to_string(),
                "daily_conversation_report_card.setCustomerParticipants".to_string(),
            ]
        );
    }

    #[test]
    fn test_unknown_extension() {
        let registry = ExtensionRegistry::new();
        let mut bag = DataBag::new();
        assert!(matches!(
            registry.invoke("nope.fn", &mut bag, &Map::new()),
            Err(TransformError::UnknownExtension(name)) if name == "nope.fn"
        ));
    }

    #[test]
    fn test_function_error_propagates() {
        let mut registry = ExtensionRegistry::new();
        registry.register("ext.fail", |_bag: &mut DataBag, _params: &Map<String, Value>| {
            Err(TransformError::Failed {
                name: "ext.fail".to_string(),
                message: "boom".to_string(),
            })
        });
        let mut bag = DataBag::new();
        assert!(registry.invoke("ext.fail", &mut bag, &Map::new()).is_err());
    }

    #[test]
    fn test_param_str() {
        let mut params = Map::new();
        params.insert("source".to_string(), json!("custom"));
        params.insert("blank".to_string(), json!(""));
        assert_eq!(param_str(&params, "source", "default"), "custom");
        assert_eq!(param_str(&params, "blank", "default"), "default");
        assert_eq!(param_str(&params, "missing", "default"), "default");
    }
}
