//! Process-wide registry
//!
//! Free functions over one shared [`Registry`], for hosts that register plug-ins
//! from many places and publish from another. Publishing works on a snapshot of
//! the registry, so plug-ins and callbacks may register or deregister while a pass
//! is running. [`reset`] returns everything, including the shared context, to its
//! initial state.

use crate::callbacks::Callback;
use crate::config::PipelineConfig;
use crate::error::{PublishError, RegistryError};
use crate::logic::AbortTest;
use crate::model::Context;
use crate::plugin::{Factory, LegacyFactory, PluginClass};
use crate::protocol::{PluginResult, Publisher};
use crate::registry::{ModuleLoader, Registry};
use crate::util;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::debug;

static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();

fn registry() -> &'static RwLock<Registry> {
    REGISTRY.get_or_init(|| RwLock::new(Registry::new()))
}

/// Copy of the shared registry as it is now.
pub fn snapshot() -> Registry {
    registry().read().clone()
}

/// Read access to the shared registry.
pub fn with_registry<R>(f: impl FnOnce(&Registry) -> R) -> R {
    f(&registry().read())
}

/// Write access to the shared registry.
pub fn with_registry_mut<R>(f: impl FnOnce(&mut Registry) -> R) -> R {
    f(&mut registry().write())
}

/// Drop every registration and the shared context.
pub fn reset() {
    let callbacks = {
        let mut registry = registry().write();
        let callbacks = registry.callbacks().clone();
        *registry = Registry::new();
        callbacks
    };
    callbacks.clear();
    Context::reset_shared();
    debug!("Process registry reset");
}

pub fn configure(config: PipelineConfig) {
    registry().write().set_config(config);
}

pub fn config() -> PipelineConfig {
    registry().read().config().clone()
}

// Paths

pub fn register_plugin_path(path: impl AsRef<Path>) -> Result<PathBuf, RegistryError> {
    registry().write().register_plugin_path(path)
}

pub fn deregister_plugin_path(path: impl AsRef<Path>) -> Result<(), RegistryError> {
    registry().write().deregister_plugin_path(path)
}

pub fn deregister_all_paths() {
    registry().write().deregister_all_paths();
}

pub fn registered_paths() -> Vec<PathBuf> {
    registry().read().registered_paths().to_vec()
}

pub fn plugin_paths() -> Vec<PathBuf> {
    registry().read().plugin_paths()
}

// Plug-ins

pub fn register_plugin(class: PluginClass) -> Result<(), RegistryError> {
    registry().write().register_plugin(class)
}

pub fn deregister_plugin(name: &str) -> Result<PluginClass, RegistryError> {
    registry().write().deregister_plugin(name)
}

pub fn deregister_all_plugins() {
    registry().write().deregister_all_plugins();
}

pub fn registered_plugins() -> Vec<PluginClass> {
    registry().read().registered_plugins().to_vec()
}

pub fn register_factory(name: impl Into<String>, factory: Factory) {
    registry().write().register_factory(name, factory);
}

pub fn register_legacy_factory(name: impl Into<String>, factory: LegacyFactory) {
    registry().write().register_legacy_factory(name, factory);
}

pub fn deregister_factory(name: &str) -> Result<(), RegistryError> {
    registry().write().deregister_factory(name)
}

pub fn register_loader(loader: Arc<dyn ModuleLoader>) {
    registry().write().register_loader(loader);
}

// Hosts and targets

pub fn register_host(host: impl Into<String>) {
    registry().write().register_host(host);
}

pub fn deregister_host(host: &str) -> Result<(), RegistryError> {
    registry().write().deregister_host(host)
}

pub fn deregister_all_hosts() {
    registry().write().deregister_all_hosts();
}

pub fn registered_hosts() -> Vec<String> {
    registry().read().registered_hosts().to_vec()
}

pub fn current_hosts() -> Vec<String> {
    registry().read().current_hosts()
}

pub fn register_target(target: impl Into<String>) {
    registry().write().register_target(target);
}

pub fn deregister_target(target: &str) -> Result<(), RegistryError> {
    registry().write().deregister_target(target)
}

pub fn deregister_all_targets() {
    registry().write().deregister_all_targets();
}

pub fn registered_targets() -> Vec<String> {
    registry().read().registered_targets().to_vec()
}

// Services

pub fn register_service(name: impl Into<String>, value: impl Into<Value>) {
    registry().write().register_service(name, value);
}

pub fn register_service_factory<F>(name: impl Into<String>, factory: F)
where
    F: Fn() -> Value + Send + Sync + 'static,
{
    registry().write().register_service_factory(name, factory);
}

pub fn deregister_service(name: &str) -> Result<(), RegistryError> {
    registry().write().deregister_service(name)
}

pub fn deregister_all_services() {
    registry().write().deregister_all_services();
}

pub fn registered_services() -> Vec<String> {
    registry().read().registered_services()
}

// Abort test

pub fn register_test(test: AbortTest) {
    registry().write().register_test(test);
}

pub fn deregister_test() {
    registry().write().deregister_test();
}

pub fn registered_test() -> AbortTest {
    registry().read().registered_test()
}

// Callbacks

pub fn register_callback(signal: impl Into<String>, callback: &Callback) {
    registry().read().register_callback(signal, callback);
}

pub fn deregister_callback(signal: &str, callback: &Callback) -> Result<(), RegistryError> {
    registry().read().deregister_callback(signal, callback)
}

pub fn deregister_all_callbacks() {
    registry().read().deregister_all_callbacks();
}

pub fn registered_callbacks() -> BTreeMap<String, usize> {
    registry().read().registered_callbacks()
}

/// Notify listeners outside the registry lock so they may call back in.
pub fn emit(signal: &str, payload: &Value) {
    let callbacks = registry().read().callbacks().clone();
    callbacks.emit(signal, payload);
}

// Discovery

pub fn discover(category: Option<&str>, regex: Option<&str>) -> Result<Vec<PluginClass>, RegistryError> {
    snapshot().discover(category, regex, None)
}

pub fn plugins_from_module(path: impl AsRef<Path>) -> Result<Vec<PluginClass>, RegistryError> {
    snapshot().plugins_from_module(path)
}

// Publishing

fn session(context: Option<&Context>) -> Context {
    context.cloned().unwrap_or_else(Context::shared)
}

/// Result stream over `plugins` (or everything discovered) on `context` (or the
/// shared context).
pub fn publish_iter(
    context: Option<&Context>,
    plugins: Option<Vec<PluginClass>>,
) -> Result<Publisher, RegistryError> {
    util::publish_iter(&snapshot(), &session(context), plugins)
}

pub fn publish(
    context: Option<&Context>,
    plugins: Option<Vec<PluginClass>>,
) -> Result<Vec<PluginResult>, RegistryError> {
    util::publish(&snapshot(), &session(context), plugins)
}

pub fn publish_checked(
    context: Option<&Context>,
    plugins: Option<Vec<PluginClass>>,
) -> Result<Vec<PluginResult>, PublishError> {
    util::publish_checked(&snapshot(), &session(context), plugins)
}

pub fn collect(
    context: Option<&Context>,
    plugins: Option<Vec<PluginClass>>,
) -> Result<Vec<PluginResult>, RegistryError> {
    util::collect(&snapshot(), &session(context), plugins)
}

pub fn validate(
    context: Option<&Context>,
    plugins: Option<Vec<PluginClass>>,
) -> Result<Vec<PluginResult>, RegistryError> {
    util::validate(&snapshot(), &session(context), plugins)
}

pub fn extract(
    context: Option<&Context>,
    plugins: Option<Vec<PluginClass>>,
) -> Result<Vec<PluginResult>, RegistryError> {
    util::extract(&snapshot(), &session(context), plugins)
}

pub fn integrate(
    context: Option<&Context>,
    plugins: Option<Vec<PluginClass>>,
) -> Result<Vec<PluginResult>, RegistryError> {
    util::integrate(&snapshot(), &session(context), plugins)
}

/// Serializes tests that touch process-global state: this registry, the shared
/// context and environment variables.
#[cfg(test)]
pub(crate) fn test_guard() -> std::sync::MutexGuard<'static, ()> {
    static GLOBAL_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
    GLOBAL_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
}
