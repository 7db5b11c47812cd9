//! Plug-in registry
//!
//! Owns the plug-in sources (registered paths, the plug-in path environment
//! variable, configured paths, in-memory classes) and everything a publish pass
//! is parameterized with: hosts, targets, services, the abort test and callbacks.

pub mod paths;

mod discovery;
mod loader;
mod manifest;

#[cfg(feature = "dylib")]
mod dylib;

pub use loader::{ModuleLoader, PluginRegistrar};
pub use manifest::ManifestLoader;

#[cfg(feature = "dylib")]
pub use dylib::{DylibLoader, RegisterFn, REGISTER_SYMBOL};

use crate::callbacks::{Callback, Callbacks};
use crate::config::PipelineConfig;
use crate::error::RegistryError;
use crate::host::current_host;
use crate::logic::{default_abort_test, AbortTest, IterOptions};
use crate::model::Context;
use crate::plugin::{validate_shape, Category, Factory, LegacyFactory, PluginClass, DEFAULT_TARGET};
use crate::protocol::Publisher;
use crate::provider::Provider;
use discovery::{compile_patterns, scan, Admission};
use loader::{load_module, Factories};
use regex::Regex;
use semver::Version;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct Registry {
    config: PipelineConfig,
    version: Version,
    paths: Vec<PathBuf>,
    plugins: Vec<PluginClass>,
    factories: Factories,
    hosts: Vec<String>,
    targets: Vec<String>,
    provider: Provider,
    test: AbortTest,
    callbacks: Callbacks,
    loaders: Vec<Arc<dyn ModuleLoader>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("version", &self.version)
            .field("paths", &self.paths)
            .field("plugins", &self.plugins.len())
            .field("factories", &self.factories.names())
            .field("hosts", &self.hosts)
            .field("targets", &self.targets)
            .field("services", &self.provider.names())
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        let mut loaders: Vec<Arc<dyn ModuleLoader>> = vec![Arc::new(ManifestLoader)];
        #[cfg(feature = "dylib")]
        loaders.push(Arc::new(DylibLoader::new()));

        Self {
            config,
            version: framework_version(),
            paths: Vec::new(),
            plugins: Vec::new(),
            factories: Factories::default(),
            hosts: Vec::new(),
            targets: vec![DEFAULT_TARGET.to_string()],
            provider: Provider::with_defaults(),
            test: default_abort_test(),
            callbacks: Callbacks::new(),
            loaders,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PipelineConfig) {
        self.config = config;
    }

    /// Framework version plug-in `requires` predicates are checked against.
    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    // Paths

    /// Add a directory to scan. Registering the same normalized path twice is a no-op.
    pub fn register_plugin_path(&mut self, path: impl AsRef<Path>) -> Result<PathBuf, RegistryError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RegistryError::PathNotFound(path.to_path_buf()));
        }
        let normalized = paths::normalize(path);
        if self.paths.contains(&normalized) {
            warn!(path = %normalized.display(), "Plug-in path already registered");
            return Ok(normalized);
        }
        debug!(path = %normalized.display(), "Registered plug-in path");
        self.paths.push(normalized.clone());
        Ok(normalized)
    }

    pub fn deregister_plugin_path(&mut self, path: impl AsRef<Path>) -> Result<(), RegistryError> {
        let normalized = paths::normalize(path.as_ref());
        let position = self
            .paths
            .iter()
            .position(|registered| *registered == normalized)
            .ok_or_else(|| RegistryError::PathNotRegistered(path.as_ref().to_path_buf()))?;
        self.paths.remove(position);
        Ok(())
    }

    pub fn deregister_all_paths(&mut self) {
        self.paths.clear();
    }

    pub fn registered_paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Every source path: registered, then environment, then configured.
    pub fn plugin_paths(&self) -> Vec<PathBuf> {
        let registered = self.paths.iter().cloned();
        let environment = paths::environment_paths(&self.config.discovery.paths_env);
        let configured = self.config.discovery.paths.iter().cloned();
        paths::dedup(registered.chain(environment).chain(configured))
    }

    // Plug-ins

    /// Register a class in memory. A class of the same name is replaced.
    pub fn register_plugin(&mut self, class: PluginClass) -> Result<(), RegistryError> {
        validate_shape(&class).map_err(|problems| RegistryError::InvalidPlugin {
            name: class.name().to_string(),
            reason: problems.join("; "),
        })?;

        match self.plugins.iter().position(|p| p.name() == class.name()) {
            Some(index) => {
                debug!(plugin = %class.name(), "Replacing registered plug-in");
                self.plugins[index] = class;
            }
            None => self.plugins.push(class),
        }
        Ok(())
    }

    pub fn deregister_plugin(&mut self, name: &str) -> Result<PluginClass, RegistryError> {
        let index = self
            .plugins
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| not_registered("Plug-in", name))?;
        Ok(self.plugins.remove(index))
    }

    pub fn deregister_all_plugins(&mut self) {
        self.plugins.clear();
    }

    pub fn registered_plugins(&self) -> &[PluginClass] {
        &self.plugins
    }

    // Factories

    /// Make a constructor available to module manifests under `name`.
    pub fn register_factory(&mut self, name: impl Into<String>, factory: Factory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn register_legacy_factory(&mut self, name: impl Into<String>, factory: LegacyFactory) {
        self.factories.insert_legacy(name.into(), factory);
    }

    pub fn deregister_factory(&mut self, name: &str) -> Result<(), RegistryError> {
        if self.factories.remove(name) {
            Ok(())
        } else {
            Err(not_registered("Factory", name))
        }
    }

    pub fn registered_factories(&self) -> Vec<String> {
        self.factories.names()
    }

    pub fn register_loader(&mut self, loader: Arc<dyn ModuleLoader>) {
        self.loaders.push(loader);
    }

    // Hosts

    pub fn register_host(&mut self, host: impl Into<String>) {
        let host = host.into();
        if !self.hosts.contains(&host) {
            self.hosts.push(host);
        }
    }

    pub fn deregister_host(&mut self, host: &str) -> Result<(), RegistryError> {
        remove_item(&mut self.hosts, host).ok_or_else(|| not_registered("Host", host))
    }

    pub fn deregister_all_hosts(&mut self) {
        self.hosts.clear();
    }

    pub fn registered_hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Registered hosts, or the running executable's host when none are.
    pub fn current_hosts(&self) -> Vec<String> {
        if self.hosts.is_empty() {
            vec![current_host()]
        } else {
            self.hosts.clone()
        }
    }

    // Targets

    pub fn register_target(&mut self, target: impl Into<String>) {
        let target = target.into();
        if !self.targets.contains(&target) {
            self.targets.push(target);
        }
    }

    pub fn deregister_target(&mut self, target: &str) -> Result<(), RegistryError> {
        remove_item(&mut self.targets, target).ok_or_else(|| not_registered("Target", target))
    }

    /// With no targets registered, plug-ins run regardless of their targets.
    pub fn deregister_all_targets(&mut self) {
        self.targets.clear();
    }

    pub fn registered_targets(&self) -> &[String] {
        &self.targets
    }

    // Services

    pub fn register_service(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.provider.inject(name, value);
    }

    pub fn register_service_factory<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.provider.inject_factory(name, factory);
    }

    pub fn deregister_service(&mut self, name: &str) -> Result<(), RegistryError> {
        self.provider
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_registered("Service", name))
    }

    pub fn deregister_all_services(&mut self) {
        self.provider.clear();
    }

    pub fn registered_services(&self) -> Vec<String> {
        self.provider.names()
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    // Abort test

    pub fn register_test(&mut self, test: AbortTest) {
        self.test = test;
    }

    /// Restore the default test.
    pub fn deregister_test(&mut self) {
        self.test = default_abort_test();
    }

    pub fn registered_test(&self) -> AbortTest {
        self.test.clone()
    }

    // Callbacks

    pub fn register_callback(&self, signal: impl Into<String>, callback: &Callback) {
        self.callbacks.register(signal, callback);
    }

    pub fn deregister_callback(&self, signal: &str, callback: &Callback) -> Result<(), RegistryError> {
        self.callbacks.deregister(signal, callback)
    }

    pub fn deregister_all_callbacks(&self) {
        self.callbacks.clear();
    }

    pub fn registered_callbacks(&self) -> BTreeMap<String, usize> {
        self.callbacks.registered()
    }

    pub fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    pub fn emit(&self, signal: &str, payload: &Value) {
        self.callbacks.emit(signal, payload);
    }

    // Discovery

    /// Find every compatible plug-in.
    ///
    /// `category` limits the scan to one category (`"validators"`, `"conform"`,
    /// ...), `regex` keeps only classes whose name matches, and `search_paths` replaces
    /// the source paths. Broken modules and ill-shaped classes are logged and
    /// excluded; only an unknown category or an invalid regex is an error.
    pub fn discover(
        &self,
        category: Option<&str>,
        regex: Option<&str>,
        search_paths: Option<&[PathBuf]>,
    ) -> Result<Vec<PluginClass>, RegistryError> {
        let categories: Vec<Category> = match category {
            Some(name) => vec![name.parse()?],
            None => Category::ALL.to_vec(),
        };
        let name_filter = regex
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| RegistryError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;
        let patterns = compile_patterns(&self.config.discovery.patterns, &categories)?;

        let sources = match search_paths {
            Some(search_paths) => paths::dedup(search_paths.iter().cloned()),
            None => self.plugin_paths(),
        };

        let mut candidates = scan(&sources, &patterns, &self.loaders, &self.factories);
        candidates.extend(self.plugins.iter().cloned());

        let hosts = self.current_hosts();
        let admission = Admission {
            categories: &categories,
            version: &self.version,
            hosts: &hosts,
            name_filter: name_filter.as_ref(),
        };
        let discovered = admission.admit(candidates);

        info!(
            paths = sources.len(),
            plugins = discovered.len(),
            "Discovered plug-ins"
        );
        Ok(discovered)
    }

    /// Classes declared by one module file, shape and version checked.
    pub fn plugins_from_module(&self, path: impl AsRef<Path>) -> Result<Vec<PluginClass>, RegistryError> {
        let path = path.as_ref();
        let module_error = |reason: String| RegistryError::Module {
            path: path.to_path_buf(),
            reason,
        };

        let loader = self
            .loaders
            .iter()
            .find(|loader| loader.handles(path))
            .ok_or_else(|| module_error("no loader handles this file type".to_string()))?;
        let module = loader
            .module_name(path)
            .ok_or_else(|| module_error("file has no name".to_string()))?;
        let patterns = compile_patterns(&self.config.discovery.patterns, &Category::ALL)?;
        let category = patterns
            .iter()
            .find(|(_, regex)| regex.is_match(&module))
            .map(|(category, _)| *category)
            .ok_or_else(|| module_error(format!("'{}' matches no category pattern", module)))?;

        let classes = load_module(loader.as_ref(), path, category, &self.factories)
            .map_err(|e| module_error(e.to_string()))?;

        Ok(classes
            .into_iter()
            .filter(|class| match validate_shape(class) {
                Ok(()) => crate::plugin::version_compatible(class, &self.version),
                Err(problems) => {
                    warn!(plugin = %class.name(), problems = %problems.join("; "), "Invalid plug-in");
                    false
                }
            })
            .collect())
    }

    // Publishing

    /// Iteration options from the registered targets and configuration.
    pub fn iter_options(&self) -> IterOptions {
        IterOptions {
            targets: (!self.targets.is_empty()).then(|| self.targets.clone()),
            publish_by_default: self.config.publish_by_default,
        }
    }

    /// A result stream over `plugins` wired to this registry's services, test and callbacks.
    pub fn publisher(&self, plugins: Vec<PluginClass>, context: &Context) -> Publisher {
        Publisher::new(plugins, context, self.iter_options())
            .with_provider(self.provider.clone())
            .with_test(self.test.clone())
            .with_callbacks(self.callbacks.clone())
    }
}

fn framework_version() -> Version {
    Version::parse(crate::FRAMEWORK_VERSION).unwrap_or_else(|_| Version::new(1, 0, 0))
}

fn remove_item(items: &mut Vec<String>, item: &str) -> Option<()> {
    let index = items.iter().position(|existing| existing == item)?;
    items.remove(index);
    Some(())
}

fn not_registered(kind: &'static str, name: &str) -> RegistryError {
    RegistryError::NotRegistered {
        kind,
        name: name.to_string(),
    }
}
