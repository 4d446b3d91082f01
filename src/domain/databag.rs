//! Per-run named-value store
//!
//! A [`DataBag`] is created empty at run start, threaded by `&mut` through
//! every stage of that run, and dropped when the run ends. Keys are stage
//! names; values are arbitrary JSON trees. There is no removal API: a key,
//! once written, lives until the run ends (writing it again overwrites it).

use serde::Serialize;
use serde_json::{Map, Value};

/// Mapping from stage name to a JSON value, owned by exactly one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DataBag {
    entries: Map<String, Value>,
}

impl DataBag {
    /// Creates an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Mutable access to an existing value
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    /// Writes a value, returning the one it replaced
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    /// Mutable access to a value, inserting `Value::Null` first if absent
    pub fn entry_mut(&mut self, key: &str) -> &mut Value {
        self.entries.entry(key.to_string()).or_insert(Value::Null)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys currently present, in sorted order
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves a JSON pointer rooted at the bag (`/get_queues/entities/0`)
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        let pointer = pointer.strip_prefix('/')?;
        let (head, rest) = match pointer.find('/') {
            Some(idx) => (&pointer[..idx], &pointer[idx..]),
            None => (pointer, ""),
        };
        let value = self.entries.get(head)?;
        if rest.is_empty() {
            Some(value)
        } else {
            value.pointer(rest)
        }
    }

    /// JSON snapshot of the whole bag, used as template context
    pub fn snapshot(&self) -> Value {
        Value::Object(self.entries.clone())
    }
}

impl From<Map<String, Value>> for DataBag {
    fn from(entries: Map<String, Value>) -> Self {
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_overwrites_existing_key() {
        let mut bag = DataBag::new();
        assert!(bag.insert("get_queues", json!({"entities": []})).is_none());

        let previous = bag.insert("get_queues", json!({"entities": [1]}));
        assert_eq!(previous, Some(json!({"entities": []})));
        assert_eq!(bag.get("get_queues"), Some(&json!({"entities": [1]})));
        assert_eq!(bag.len(), 1);
    }

    #[test]
    fn test_entry_mut_inserts_null() {
        let mut bag = DataBag::new();
        *bag.entry_mut("report") = json!({"totals": {}});
        assert!(bag.contains_key("report"));
        assert!(bag.entry_mut("report").is_object());
    }

    #[test]
    fn test_pointer() {
        let mut bag = DataBag::new();
        bag.insert("get_queues", json!({"entities": [{"id": "q1"}]}));

        assert_eq!(bag.pointer("/get_queues/entities/0/id"), Some(&json!("q1")));
        assert_eq!(bag.pointer("/get_queues"), bag.get("get_queues"));
        assert!(bag.pointer("/missing").is_none());
        assert!(bag.pointer("no-leading-slash").is_none());
    }

    #[test]
    fn test_snapshot_serializes_transparently() {
        let mut bag = DataBag::new();
        bag.insert("a", json!(1));
        assert_eq!(bag.snapshot(), json!({"a": 1}));
        assert_eq!(serde_json::to_value(&bag).unwrap(), json!({"a": 1}));
        assert_eq!(bag.keys(), vec!["a".to_string()]);
    }
}
