//! Family, host and target matching

use crate::model::Instance;
use crate::plugin::{PluginClass, WILDCARD};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How a plug-in's families are compared against an instance's families.
///
/// A plug-in declaring no families, or the wildcard, matches every instance in
/// every mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Any overlap between the two family sets
    #[default]
    Subset,
    /// The instance's family set equals the plug-in's
    Exact,
    /// The instance carries every family the plug-in declares
    #[serde(alias = "intersection")]
    Superset,
}

fn is_wildcard(items: &[String]) -> bool {
    items.iter().any(|item| item == WILDCARD)
}

pub fn family_matches(mode: MatchMode, plugin_families: &[String], instance_families: &[String]) -> bool {
    if plugin_families.is_empty() || is_wildcard(plugin_families) {
        return true;
    }

    match mode {
        MatchMode::Subset => instance_families
            .iter()
            .any(|family| plugin_families.contains(family)),
        MatchMode::Exact => {
            let declared: BTreeSet<&String> = plugin_families.iter().collect();
            let carried: BTreeSet<&String> = instance_families.iter().collect();
            declared == carried
        }
        MatchMode::Superset => plugin_families
            .iter()
            .all(|family| instance_families.contains(family)),
    }
}

/// Instances compatible with `plugin`, in their original relative order.
pub fn instances_by_plugin(instances: &[Instance], plugin: &PluginClass) -> Vec<Instance> {
    instances
        .iter()
        .filter(|instance| {
            family_matches(plugin.match_mode(), plugin.families(), &instance.families())
        })
        .cloned()
        .collect()
}

/// Whether a plug-in runs under any of `hosts`. A plug-in without hosts runs
/// everywhere.
pub fn host_matches(plugin: &PluginClass, hosts: &[String]) -> bool {
    plugin.hosts().is_empty()
        || is_wildcard(plugin.hosts())
        || plugin.hosts().iter().any(|host| hosts.contains(host))
}

pub fn plugins_by_host(plugins: &[PluginClass], host: &str) -> Vec<PluginClass> {
    let hosts = [host.to_string()];
    plugins
        .iter()
        .filter(|plugin| host_matches(plugin, &hosts))
        .cloned()
        .collect()
}

pub fn plugins_by_family(plugins: &[PluginClass], family: &str) -> Vec<PluginClass> {
    let families = [family.to_string()];
    plugins
        .iter()
        .filter(|plugin| family_matches(plugin.match_mode(), plugin.families(), &families))
        .cloned()
        .collect()
}

pub fn plugins_by_instance(plugins: &[PluginClass], instance: &Instance) -> Vec<PluginClass> {
    let families = instance.families();
    plugins
        .iter()
        .filter(|plugin| family_matches(plugin.match_mode(), plugin.families(), &families))
        .cloned()
        .collect()
}

/// Whether a plug-in belongs to one of the requested targets.
pub fn target_matches(plugin: &PluginClass, targets: &[String]) -> bool {
    is_wildcard(plugin.targets()) || plugin.targets().iter().any(|t| targets.contains(t))
}

/// Sort ascending by order. Ties keep their incoming order.
pub fn sort(plugins: &mut [PluginClass]) {
    plugins.sort_by(|a, b| a.sort_order().total_cmp(&b.sort_order()));
}
