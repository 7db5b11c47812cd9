//! Module loading contract

use crate::error::ModuleError;
use crate::plugin::{Category, Constructor, Factory, LegacyFactory, PluginClass};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Named constructors that module manifests refer to.
#[derive(Clone, Default)]
pub(crate) struct Factories {
    entries: BTreeMap<String, Constructor>,
}

impl Factories {
    pub(crate) fn insert(&mut self, name: String, factory: Factory) {
        self.entries.insert(name, Constructor::Current(factory));
    }

    pub(crate) fn insert_legacy(&mut self, name: String, factory: LegacyFactory) {
        self.entries.insert(name, Constructor::Legacy(factory));
    }

    pub(crate) fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn get(&self, name: &str) -> Option<&Constructor> {
        self.entries.get(name)
    }
}

/// Collects the classes one module declares.
pub struct PluginRegistrar<'a> {
    factories: &'a Factories,
    module: PathBuf,
    category: Category,
    plugins: Vec<PluginClass>,
}

impl<'a> PluginRegistrar<'a> {
    pub(crate) fn new(factories: &'a Factories, module: &Path, category: Category) -> Self {
        Self {
            factories,
            module: module.to_path_buf(),
            category,
            plugins: Vec::new(),
        }
    }

    /// Category whose file pattern matched the module.
    pub fn category(&self) -> Category {
        self.category
    }

    pub fn module(&self) -> &Path {
        &self.module
    }

    pub fn register(&mut self, class: PluginClass) {
        self.plugins.push(class);
    }

    pub(crate) fn constructor(&self, name: &str) -> Result<Constructor, ModuleError> {
        self.factories
            .get(name)
            .cloned()
            .ok_or_else(|| ModuleError::UnknownFactory(name.to_string()))
    }

    pub(crate) fn into_plugins(self) -> Vec<PluginClass> {
        let module = self.module;
        self.plugins
            .into_iter()
            .map(|mut class| {
                class.set_source(module.clone());
                class
            })
            .collect()
    }
}

/// Turns a module file into plug-in classes.
pub trait ModuleLoader: Send + Sync {
    /// File extensions handled, lower-case and without the dot.
    fn extensions(&self) -> &[&'static str];

    /// Name used for category matching and module collision checks.
    fn module_name(&self, path: &Path) -> Option<String> {
        path.file_stem().map(|stem| stem.to_string_lossy().into_owned())
    }

    fn load(&self, path: &Path, registrar: &mut PluginRegistrar<'_>) -> Result<(), ModuleError>;

    fn handles(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .map(|ext| self.extensions().iter().any(|known| *known == ext))
            .unwrap_or(false)
    }
}

/// Load one module with `loader` into sourced classes.
pub(crate) fn load_module(
    loader: &dyn ModuleLoader,
    path: &Path,
    category: Category,
    factories: &Factories,
) -> Result<Vec<PluginClass>, ModuleError> {
    let mut registrar = PluginRegistrar::new(factories, path, category);
    loader.load(path, &mut registrar)?;
    Ok(registrar.into_plugins())
}
