//! Publish session root container

use super::data::{DataMap, DataStore};
use super::instance::Instance;
use super::KEY_RESULTS;
use crate::error::DataError;
use parking_lot::{const_mutex, Mutex, RwLock};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Process-wide context used by the legacy singleton façade.
static SHARED: Mutex<Option<Context>> = const_mutex(None);

pub(crate) struct ContextInner {
    instances: RwLock<Vec<Instance>>,
    pub(crate) data: DataStore,
}

/// Root container of a publish session.
///
/// `Context` is a cheap handle; clones share the same instances and data. Instances
/// are unique by effective name: adding an equal instance twice is a no-op.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ContextInner {
                instances: RwLock::new(Vec::new()),
                data: DataStore::default(),
            }),
        }
    }

    /// The process-wide context, created on first access.
    ///
    /// Every caller gets the same session until [`Context::reset_shared`] drops it.
    pub fn shared() -> Context {
        let mut shared = SHARED.lock();
        shared.get_or_insert_with(Context::new).clone()
    }

    /// Dissociate the process-wide context; the next [`Context::shared`] builds a
    /// fresh one. Handles obtained earlier keep working but are no longer shared.
    pub fn reset_shared() {
        let mut shared = SHARED.lock();
        if shared.take().is_some() {
            debug!("Shared context reset");
        }
    }

    pub(crate) fn from_inner(inner: Arc<ContextInner>) -> Self {
        Self { inner }
    }

    /// Create an instance parented to this context and append it.
    ///
    /// If an instance with the same effective name already exists, that instance is
    /// returned instead and nothing is added.
    pub fn create_instance(&self, name: impl Into<String>) -> Instance {
        let instance = Instance::new(name);
        if let Some(existing) = self.get(&instance.name()) {
            return existing;
        }
        self.add(instance.clone());
        instance
    }

    /// Append an instance. No-op when an equal instance is already present.
    pub fn add(&self, instance: Instance) {
        let mut instances = self.inner.instances.write();
        if instances.iter().any(|existing| *existing == instance) {
            debug!(instance = %instance.name(), "Instance already in context");
            return;
        }
        instance.set_parent(Arc::downgrade(&self.inner));
        instances.push(instance);
    }

    /// Remove an instance, failing when it is not a member.
    pub fn remove(&self, instance: &Instance) -> Result<Instance, DataError> {
        let mut instances = self.inner.instances.write();
        let position = instances
            .iter()
            .position(|existing| existing == instance)
            .ok_or_else(|| DataError::InstanceNotFound(instance.name()))?;
        let removed = instances.remove(position);
        removed.clear_parent();
        Ok(removed)
    }

    pub fn remove_instance(&self, name: &str) -> Result<Instance, DataError> {
        let instance = self
            .get(name)
            .ok_or_else(|| DataError::InstanceNotFound(name.to_string()))?;
        self.remove(&instance)
    }

    /// Snapshot of the member instances in insertion order.
    pub fn instances(&self) -> Vec<Instance> {
        self.inner.instances.read().clone()
    }

    pub fn get(&self, name: &str) -> Option<Instance> {
        self.inner
            .instances
            .read()
            .iter()
            .find(|instance| instance.name() == name)
            .cloned()
    }

    pub fn contains(&self, instance: &Instance) -> bool {
        self.inner.instances.read().iter().any(|i| i == instance)
    }

    pub fn len(&self) -> usize {
        self.inner.instances.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.instances.read().is_empty()
    }

    pub fn data(&self, key: &str) -> Option<Value> {
        self.inner.data.get(key)
    }

    pub fn data_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.inner.data.get(key).unwrap_or_else(|| default.into())
    }

    /// Copy of the full data mapping
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

    /// Append an entry to the session's result log.
    pub fn append_result(&self, entry: Value) {
        self.inner.data.update(KEY_RESULTS, |results| match results {
            Value::Array(items) => items.push(entry),
            other => *other = Value::Array(vec![entry]),
        });
    }

    /// Whether two handles refer to the same session.
    pub fn same_session(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.instances().iter().map(Instance::name).collect();
        f.debug_struct("Context")
            .field("instances", &names)
            .field("data", &self.data_all())
            .finish()
    }
}
