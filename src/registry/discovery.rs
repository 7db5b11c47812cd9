//! Filesystem scan and admission filters

use super::loader::{load_module, Factories, ModuleLoader};
use crate::config::PatternConfig;
use crate::error::RegistryError;
use crate::logic::host_matches;
use crate::plugin::{validate_shape, version_compatible, Category, PluginClass};
use regex::Regex;
use semver::Version;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, warn};
use walkdir::WalkDir;

/// Compiled file-stem pattern per scanned category, in category order.
pub(crate) fn compile_patterns(
    patterns: &PatternConfig,
    categories: &[Category],
) -> Result<Vec<(Category, Regex)>, RegistryError> {
    categories
        .iter()
        .map(|category| {
            let pattern = patterns.for_category(*category);
            Regex::new(pattern)
                .map(|regex| (*category, regex))
                .map_err(|e| RegistryError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                })
        })
        .collect()
}

/// Regular files directly inside `dir`, sorted by file name.
fn module_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(path = %dir.display(), error = %err, "Failed to read plug-in path entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

/// Load every module found under `paths`, in path order.
///
/// A module whose name was already loaded earlier in the pass is skipped. Modules
/// that fail to load are logged and skipped.
pub(crate) fn scan(
    paths: &[PathBuf],
    patterns: &[(Category, Regex)],
    loaders: &[Arc<dyn ModuleLoader>],
    factories: &Factories,
) -> Vec<PluginClass> {
    let mut loaded: BTreeMap<String, PathBuf> = BTreeMap::new();
    let mut found = Vec::new();

    for dir in paths {
        if !dir.is_dir() {
            warn!(path = %dir.display(), "Plug-in path is not a directory, skipping");
            continue;
        }

        for file in module_files(dir) {
            let Some(loader) = loaders.iter().find(|loader| loader.handles(&file)) else {
                continue;
            };
            let Some(module) = loader.module_name(&file) else {
                continue;
            };
            let Some(category) = patterns
                .iter()
                .find(|(_, regex)| regex.is_match(&module))
                .map(|(category, _)| *category)
            else {
                continue;
            };

            if let Some(previous) = loaded.get(&module) {
                warn!(
                    module = %module,
                    path = %file.display(),
                    previous = %previous.display(),
                    "Duplicate module name, skipping"
                );
                continue;
            }
            loaded.insert(module.clone(), file.clone());

            match load_module(loader.as_ref(), &file, category, factories) {
                Ok(classes) => {
                    debug!(module = %module, plugins = classes.len(), "Loaded module");
                    found.extend(classes);
                }
                Err(err) => {
                    error!(module = %module, path = %file.display(), error = %err, "Failed to load module");
                }
            }
        }
    }

    found
}

/// Everything a candidate must satisfy to be discovered.
pub(crate) struct Admission<'a> {
    pub categories: &'a [Category],
    pub version: &'a Version,
    pub hosts: &'a [String],
    pub name_filter: Option<&'a Regex>,
}

impl Admission<'_> {
    /// Filter candidates in order. The first class of a given name that survives
    /// the host and name filters wins.
    pub(crate) fn admit(&self, candidates: Vec<PluginClass>) -> Vec<PluginClass> {
        let mut names = BTreeSet::new();
        let mut admitted = Vec::new();

        for class in candidates {
            if !self.categories.contains(&class.category()) {
                continue;
            }

            if let Err(problems) = validate_shape(&class) {
                error!(
                    plugin = %class.name(),
                    problems = %problems.join("; "),
                    "Invalid plug-in, excluding"
                );
                continue;
            }

            if !version_compatible(&class, self.version) {
                warn!(
                    plugin = %class.name(),
                    requires = %class.requires(),
                    version = %self.version,
                    "Plug-in requires another framework version, excluding"
                );
                continue;
            }

            if !host_matches(&class, self.hosts) {
                debug!(plugin = %class.name(), "Plug-in does not support the current host");
                continue;
            }

            if let Some(filter) = self.name_filter {
                if !filter.is_match(class.name()) {
                    continue;
                }
            }

            if !names.insert(class.name().to_string()) {
                warn!(
                    plugin = %class.name(),
                    source = ?class.source(),
                    "Duplicate plug-in name, excluding"
                );
                continue;
            }

            admitted.push(class);
        }

        admitted
    }
}
