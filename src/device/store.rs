//! Key/value configuration store
//!
//! Holds user output profiles and listening-mode overrides. Values are JSON.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::Result;

pub trait ConfigStore: Send {
    fn get(&self, key: &str) -> Option<Value>;

    fn put(&mut self, key: &str, value: Value) -> Result<()>;

    fn remove(&mut self, key: &str);

    fn keys(&self) -> Vec<String>;
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    values: HashMap<String, Value>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.values.keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// Read and decode a typed value; undecodable entries are ignored
pub fn load_json<T: DeserializeOwned>(store: &dyn ConfigStore, key: &str) -> Option<T> {
    let value = store.get(key)?;
    match serde_json::from_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Ignoring malformed config entry '{}': {}", key, e);
            None
        }
    }
}

/// Encode and write a typed value
pub fn save_json<T: Serialize>(store: &mut dyn ConfigStore, key: &str, value: &T) -> Result<()> {
    store.put(key, serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_store() {
        let mut store = MemoryConfigStore::new();
        store.put("b", json!(2)).unwrap();
        store.put("a", json!({"x": 1})).unwrap();
        assert_eq!(store.keys(), vec!["a", "b"]);
        assert_eq!(store.get("b"), Some(json!(2)));
        store.remove("b");
        assert_eq!(store.get("b"), None);
    }

    #[test]
    fn test_malformed_entry_ignored() {
        let mut store = MemoryConfigStore::new();
        store.put("n", json!("not a number")).unwrap();
        assert_eq!(load_json::<u32>(&store, "n"), None);
        save_json(&mut store, "n", &5u32).unwrap();
        assert_eq!(load_json::<u32>(&store, "n"), Some(5));
    }
}
