//! Lazy iteration over (plug-in, instance) units

use super::matching::{instances_by_plugin, sort, target_matches};
use crate::model::{Context, Instance};
use crate::plugin::{PluginClass, WILDCARD};
use std::collections::VecDeque;
use tracing::debug;

/// One unit of processing: a plug-in and the instance it runs against, or `None`
/// for a context-level pass.
#[derive(Debug, Clone)]
pub struct Unit {
    pub plugin: PluginClass,
    pub instance: Option<Instance>,
}

impl Unit {
    pub fn order(&self) -> f64 {
        self.plugin.sort_order()
    }
}

#[derive(Debug, Clone)]
pub struct IterOptions {
    /// Only plug-ins targeting one of these run; `None` disables the filter.
    pub targets: Option<Vec<String>>,
    /// Whether instances without an explicit `publish` flag are processed.
    pub publish_by_default: bool,
}

impl Default for IterOptions {
    fn default() -> Self {
        Self {
            targets: None,
            publish_by_default: true,
        }
    }
}

/// Units in plug-in order.
///
/// Compatible instances are computed when a plug-in is reached, so instances
/// added by earlier plug-ins are seen by later ones.
#[derive(Debug, Clone)]
pub struct Units {
    plugins: VecDeque<PluginClass>,
    context: Context,
    options: IterOptions,
    pending: VecDeque<Unit>,
}

impl Units {
    pub fn new(plugins: Vec<PluginClass>, context: &Context) -> Self {
        Self::with_options(plugins, context, IterOptions::default())
    }

    pub fn with_options(mut plugins: Vec<PluginClass>, context: &Context, options: IterOptions) -> Self {
        sort(&mut plugins);
        Self {
            plugins: plugins.into(),
            context: context.clone(),
            options,
            pending: VecDeque::new(),
        }
    }

    /// Next unit without consuming it.
    pub fn peek(&mut self) -> Option<&Unit> {
        self.fill();
        self.pending.front()
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    fn fill(&mut self) {
        while self.pending.is_empty() {
            let Some(plugin) = self.plugins.pop_front() else {
                return;
            };
            self.pending
                .extend(units_for(&plugin, &self.context, &self.options));
        }
    }
}

impl Iterator for Units {
    type Item = Unit;

    fn next(&mut self) -> Option<Unit> {
        self.fill();
        self.pending.pop_front()
    }
}

/// Units one plug-in contributes against the context as it is now.
pub(crate) fn units_for(plugin: &PluginClass, context: &Context, options: &IterOptions) -> Vec<Unit> {
    if !plugin.active() {
        debug!(plugin = %plugin.name(), "Skipping inactive plug-in");
        return Vec::new();
    }

    if let Some(targets) = &options.targets {
        if !target_matches(plugin, targets) {
            debug!(plugin = %plugin.name(), "Skipping plug-in outside requested targets");
            return Vec::new();
        }
    }

    if !plugin.is_instance_scoped() {
        return vec![Unit {
            plugin: plugin.clone(),
            instance: None,
        }];
    }

    let candidates = publishable_instances(context, options.publish_by_default);
    let compatible = instances_by_plugin(&candidates, plugin);
    if compatible.is_empty() {
        if plugin.families().iter().any(|f| f == WILDCARD) {
            return vec![Unit {
                plugin: plugin.clone(),
                instance: None,
            }];
        }
        debug!(plugin = %plugin.name(), "No compatible instances");
        return Vec::new();
    }

    compatible
        .into_iter()
        .map(|instance| Unit {
            plugin: plugin.clone(),
            instance: Some(instance),
        })
        .collect()
}

/// Instances in context order, minus those opted out of publishing.
pub(crate) fn publishable_instances(context: &Context, publish_by_default: bool) -> Vec<Instance> {
    context
        .instances()
        .into_iter()
        .filter(|instance| instance.publish_flag().unwrap_or(publish_by_default))
        .collect()
}
