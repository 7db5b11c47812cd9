//! Key/value data shared by contexts and instances.

use crate::error::DataError;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;

pub type DataMap = BTreeMap<String, Value>;

#[derive(Debug, Default)]
pub(crate) struct DataStore {
    entries: RwLock<DataMap>,
}

impl DataStore {
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    pub fn all(&self) -> DataMap {
        self.entries.read().clone()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.entries.write().insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Result<Value, DataError> {
        self.entries
            .write()
            .remove(key)
            .ok_or_else(|| DataError::KeyNotFound(key.to_string()))
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Run `f` against the entry for `key` under a single write lock.
    pub fn update<R>(&self, key: &str, f: impl FnOnce(&mut Value) -> R) -> R {
        let mut entries = self.entries.write();
        let entry = entries.entry(key.to_string()).or_insert(Value::Null);
        f(entry)
    }
}
