//! Dependency injection by parameter name
//!
//! A plug-in class declares the service names its `process` needs. The
//! [`Provider`] resolves each name to a value before the call: `context` and
//! `instance` come from the unit being processed, everything else from the
//! registered services. A name nothing provides fails the invocation.

use crate::error::PluginError;
use crate::model::{Context, Instance};
use crate::plugin::{Plugin, PluginClass};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub const PARAM_CONTEXT: &str = "context";
pub const PARAM_INSTANCE: &str = "instance";

/// Zero-argument service re-evaluated on every resolution
pub type ServiceFactory = Arc<dyn Fn() -> Value + Send + Sync>;

#[derive(Clone)]
pub enum Service {
    /// Resolved once at registration, constant for the run
    Value(Value),
    /// Called again for every invocation
    Factory(ServiceFactory),
}

impl Service {
    pub fn resolve(&self) -> Value {
        match self {
            Service::Value(value) => value.clone(),
            Service::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Service::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Registry of named services
#[derive(Debug, Clone, Default)]
pub struct Provider {
    services: BTreeMap<String, Service>,
}

impl Provider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider with the ambient `user` and `time` services.
    pub fn with_defaults() -> Self {
        let mut provider = Self::new();
        provider.inject("user", current_user());
        provider.inject_factory("time", || Value::String(chrono::Utc::now().to_rfc3339()));
        provider
    }

    /// Register a by-value service.
    pub fn inject(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.services.insert(name.into(), Service::Value(value.into()));
    }

    /// Register a by-reference service.
    pub fn inject_factory<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.services
            .insert(name.into(), Service::Factory(Arc::new(factory)));
    }

    pub fn inject_service(&mut self, name: impl Into<String>, service: Service) {
        self.services.insert(name.into(), service);
    }

    pub fn remove(&mut self, name: &str) -> Option<Service> {
        self.services.remove(name)
    }

    pub fn clear(&mut self) {
        self.services.clear();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    /// Declared parameter names of a plug-in class.
    pub fn args(class: &PluginClass) -> &[String] {
        class.params()
    }

    /// Resolve `params` against the unit and the registered services.
    pub fn resolve(
        &self,
        params: &[String],
        context: &Context,
        instance: Option<&Instance>,
    ) -> Result<Arguments, PluginError> {
        let mut args = Arguments::default();
        for param in params {
            match param.as_str() {
                PARAM_CONTEXT => args.context = Some(context.clone()),
                PARAM_INSTANCE => {
                    args.wants_instance = true;
                    args.instance = instance.cloned();
                }
                name => {
                    let service = self
                        .services
                        .get(name)
                        .ok_or_else(|| PluginError::unresolved(name))?;
                    args.values.insert(name.to_string(), service.resolve());
                }
            }
        }
        Ok(args)
    }

    /// Resolve the declared params and call `process`.
    pub fn invoke(
        &self,
        plugin: &mut dyn Plugin,
        params: &[String],
        context: &Context,
        instance: Option<&Instance>,
    ) -> Result<(), PluginError> {
        let args = self.resolve(params, context, instance)?;
        plugin.process(&args)
    }
}

/// Values resolved for one `process` call
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    context: Option<Context>,
    instance: Option<Instance>,
    wants_instance: bool,
    values: BTreeMap<String, Value>,
}

impl Arguments {
    /// The session context; fails unless `context` was declared.
    #[track_caller]
    pub fn context(&self) -> Result<&Context, PluginError> {
        self.context
            .as_ref()
            .ok_or_else(|| PluginError::unresolved(PARAM_CONTEXT))
    }

    /// The unit's instance; fails unless `instance` was declared and the unit has one.
    #[track_caller]
    pub fn instance(&self) -> Result<&Instance, PluginError> {
        match &self.instance {
            Some(instance) => Ok(instance),
            None if self.wants_instance => Err(PluginError::missing_data(PARAM_INSTANCE)),
            None => Err(PluginError::unresolved(PARAM_INSTANCE)),
        }
    }

    /// The unit's instance, `None` for a wildcard pass over an empty context.
    pub fn instance_opt(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    #[track_caller]
    pub fn value(&self, name: &str) -> Result<&Value, PluginError> {
        self.values
            .get(name)
            .ok_or_else(|| PluginError::unresolved(name))
    }

    /// Deserialize a resolved service into `T`.
    #[track_caller]
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, PluginError> {
        let value = self.value(name)?.clone();
        serde_json::from_value(value)
            .map_err(|e| PluginError::failed(format!("service '{}' has the wrong shape: {}", name, e)))
    }
}

/// Acting user from the environment.
pub fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
