//! A single publishable unit within a context

use super::context::{Context, ContextInner};
use super::data::{DataMap, DataStore};
use super::{KEY_FAMILIES, KEY_FAMILY, KEY_NAME, KEY_PUBLISH};
use crate::error::DataError;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};

struct InstanceInner {
    name: String,
    data: DataStore,
    /// Owning context; never keeps it alive.
    parent: RwLock<Weak<ContextInner>>,
}

/// A publishable unit of work.
///
/// Two instances are equal when their effective names match, where a `"name"`
/// data entry overrides the name given at construction.
#[derive(Clone)]
pub struct Instance {
    inner: Arc<InstanceInner>,
}

impl Instance {
    /// Create a detached instance. Use [`Context::create_instance`] or
    /// [`Context::add`] to parent it.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(InstanceInner {
                name: name.into(),
                data: DataStore::default(),
                parent: RwLock::new(Weak::new()),
            }),
        }
    }

    /// Effective name: the `"name"` data override when it is a string, else the
    /// native name.
    pub fn name(&self) -> String {
        match self.inner.data.get(KEY_NAME) {
            Some(Value::String(name)) => name,
            _ => self.inner.name.clone(),
        }
    }

    /// Name given at construction
    pub fn native_name(&self) -> &str {
        &self.inner.name
    }

    /// Owning context, if the instance is parented and the context is alive.
    pub fn context(&self) -> Option<Context> {
        self.inner.parent.read().upgrade().map(Context::from_inner)
    }

    pub(crate) fn set_parent(&self, parent: Weak<ContextInner>) {
        *self.inner.parent.write() = parent;
    }

    pub(crate) fn clear_parent(&self) {
        *self.inner.parent.write() = Weak::new();
    }

    pub fn data(&self, key: &str) -> Option<Value> {
        self.inner.data.get(key)
    }

    pub fn data_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.inner.data.get(key).unwrap_or_else(|| default.into())
    }

    pub fn data_all(&self) -> DataMap {
        self.inner.data.all()
    }

    pub fn set_data(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.inner.data.set(key, value.into());
    }

    pub fn remove_data(&self, key: &str) -> Result<Value, DataError> {
        self.inner.data.remove(key)
    }

    pub fn has_data(&self, key: &str) -> bool {
        self.inner.data.has(key)
    }

    /// Primary family, from the `"family"` entry or the first of `"families"`.
    pub fn family(&self) -> Option<String> {
        self.families().into_iter().next()
    }

    /// All families: `"family"` first, then `"families"`, without repeats.
    pub fn families(&self) -> Vec<String> {
        let mut families = Vec::new();
        if let Some(Value::String(family)) = self.inner.data.get(KEY_FAMILY) {
            families.push(family);
        }
        if let Some(Value::Array(items)) = self.inner.data.get(KEY_FAMILIES) {
            for item in items {
                if let Value::String(family) = item {
                    if !families.contains(&family) {
                        families.push(family);
                    }
                }
            }
        }
        families
    }

    /// Explicit `"publish"` flag, if one is set.
    pub fn publish_flag(&self) -> Option<bool> {
        self.inner.data.get(KEY_PUBLISH).and_then(|v| v.as_bool())
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.name() == other.name()
    }
}

impl Eq for Instance {}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("name", &self.name())
            .field("data", &self.data_all())
            .finish()
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
