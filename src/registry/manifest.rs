//! TOML plug-in modules
//!
//! A module file lists `[[plugin]]` tables. Each names a `factory` registered in
//! memory and supplies the class metadata:
//!
//! ```toml
//! [[plugin]]
//! name = "ValidateNormals"
//! factory = "validate_normals"
//! order = 1.1
//! families = ["model"]
//! params = ["instance"]
//! ```

use super::loader::{ModuleLoader, PluginRegistrar};
use crate::error::ModuleError;
use crate::logic::MatchMode;
use crate::plugin::{Category, Constructor, PluginClass};
use semver::Version;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ModuleManifest {
    #[serde(default, rename = "plugin")]
    plugins: Vec<PluginEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PluginEntry {
    name: String,
    factory: String,
    category: Option<Category>,
    label: Option<String>,
    order: Option<f64>,
    #[serde(default)]
    hosts: Vec<String>,
    #[serde(default)]
    families: Vec<String>,
    targets: Option<Vec<String>>,
    requires: Option<String>,
    version: Option<String>,
    active: Option<bool>,
    #[serde(default)]
    optional: bool,
    #[serde(default, rename = "match")]
    match_mode: MatchMode,
    #[serde(default)]
    params: Vec<String>,
}

impl PluginEntry {
    fn into_class(self, registrar: &PluginRegistrar<'_>) -> Result<PluginClass, ModuleError> {
        let constructor = registrar.constructor(&self.factory)?;
        let category = self.category.unwrap_or_else(|| registrar.category());

        let mut builder = PluginClass::builder(self.name, category)
            .hosts(self.hosts)
            .families(self.families)
            .optional(self.optional)
            .match_mode(self.match_mode)
            .params(self.params);
        if let Some(label) = self.label {
            builder = builder.label(label);
        }
        if let Some(order) = self.order {
            builder = builder.order(order);
        }
        if let Some(targets) = self.targets {
            builder = builder.targets(targets);
        }
        if let Some(requires) = self.requires {
            builder = builder.requires(requires);
        }
        if let Some(version) = self.version {
            let version = Version::parse(&version)
                .map_err(|e| ModuleError::Parse(format!("version '{}': {}", version, e)))?;
            builder = builder.version(version);
        }
        if let Some(active) = self.active {
            builder = builder.active(active);
        }

        Ok(match constructor {
            Constructor::Current(factory) => builder.build(factory),
            Constructor::Legacy(factory) => builder.build_legacy(factory),
        })
    }
}

/// Loads `*.toml` plug-in modules.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestLoader;

impl ModuleLoader for ManifestLoader {
    fn extensions(&self) -> &[&'static str] {
        &["toml"]
    }

    fn load(&self, path: &Path, registrar: &mut PluginRegistrar<'_>) -> Result<(), ModuleError> {
        let text = fs::read_to_string(path)?;
        let manifest: ModuleManifest =
            toml::from_str(&text).map_err(|e| ModuleError::Parse(e.to_string()))?;

        let mut classes = Vec::with_capacity(manifest.plugins.len());
        for entry in manifest.plugins {
            classes.push(entry.into_class(registrar)?);
        }
        for class in classes {
            registrar.register(class);
        }
        Ok(())
    }
}
