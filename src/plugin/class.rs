//! Plug-in class: declared metadata plus a constructor

use super::category::Category;
use super::legacy::LegacyPlugin;
use super::{FnPlugin, Plugin, DEFAULT_TARGET};
use crate::error::PluginError;
use crate::logic::MatchMode;
use crate::provider::{Arguments, PARAM_INSTANCE};
use semver::Version;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Builds a fresh plug-in object for one processed unit.
pub type Factory = Arc<dyn Fn() -> Result<Box<dyn Plugin>, PluginError> + Send + Sync>;

/// Builds a fresh context-wide legacy plug-in object.
pub type LegacyFactory = Arc<dyn Fn() -> Result<Box<dyn LegacyPlugin>, PluginError> + Send + Sync>;

/// Default framework requirement of a plug-in
pub const DEFAULT_REQUIRES: &str = ">=1.0.0";

#[derive(Clone)]
pub(crate) enum Constructor {
    Current(Factory),
    Legacy(LegacyFactory),
}

/// Class-level description of a plug-in.
///
/// Cloning is cheap and keeps the same [`PluginClass::id`]; two independently
/// declared classes with the same name get different ids.
#[derive(Clone)]
pub struct PluginClass {
    name: String,
    label: Option<String>,
    id: Uuid,
    category: Category,
    order: Option<f64>,
    hosts: Vec<String>,
    families: Vec<String>,
    targets: Vec<String>,
    requires: String,
    version: Version,
    active: bool,
    optional: bool,
    match_mode: MatchMode,
    params: Vec<String>,
    source: Option<PathBuf>,
    constructor: Constructor,
}

impl PluginClass {
    /// Start declaring a plug-in. The order defaults to the category's band anchor.
    pub fn builder(name: impl Into<String>, category: Category) -> PluginBuilder {
        PluginBuilder {
            name: name.into(),
            label: None,
            category,
            order: Some(category.default_order()),
            hosts: Vec::new(),
            families: Vec::new(),
            targets: vec![DEFAULT_TARGET.to_string()],
            requires: DEFAULT_REQUIRES.to_string(),
            version: Version::new(0, 0, 0),
            active: true,
            optional: false,
            match_mode: MatchMode::default(),
            params: Vec::new(),
            source: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display name; falls back to the class name.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Declared order; `None` means the class is ill-shaped.
    pub fn order(&self) -> Option<f64> {
        self.order
    }

    /// Order used for sorting. Undefined orders sort last.
    pub fn sort_order(&self) -> f64 {
        self.order.unwrap_or(f64::INFINITY)
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn families(&self) -> &[String] {
        &self.families
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn requires(&self) -> &str {
        &self.requires
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn optional(&self) -> bool {
        self.optional
    }

    pub fn match_mode(&self) -> MatchMode {
        self.match_mode
    }

    /// Service names `process` asks for
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Module file the class was discovered in; `None` for in-memory classes.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub(crate) fn set_source(&mut self, source: PathBuf) {
        self.source = Some(source);
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self.constructor, Constructor::Legacy(_))
    }

    /// Whether processing runs once per compatible instance. Context-scoped
    /// classes, legacy ones included, run once per pass.
    pub fn is_instance_scoped(&self) -> bool {
        !self.is_legacy() && self.params.iter().any(|p| p == PARAM_INSTANCE)
    }

    pub(crate) fn constructor(&self) -> &Constructor {
        &self.constructor
    }
}

impl fmt::Debug for PluginClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginClass")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("category", &self.category)
            .field("order", &self.order)
            .field("hosts", &self.hosts)
            .field("families", &self.families)
            .field("targets", &self.targets)
            .field("requires", &self.requires)
            .field("active", &self.active)
            .field("match_mode", &self.match_mode)
            .field("params", &self.params)
            .field("legacy", &self.is_legacy())
            .finish()
    }
}

/// Declares a [`PluginClass`].
///
/// ```
/// use publish_core::{Category, PluginClass};
///
/// let validate = PluginClass::builder("ValidateNaming", Category::Validator)
///     .families(["model"])
///     .params(["instance"])
///     .process_fn(|args| {
///         args.instance()?.set_data("validated", true);
///         Ok(())
///     });
/// assert!(validate.is_instance_scoped());
/// ```
#[derive(Debug, Clone)]
pub struct PluginBuilder {
    name: String,
    label: Option<String>,
    category: Category,
    order: Option<f64>,
    hosts: Vec<String>,
    families: Vec<String>,
    targets: Vec<String>,
    requires: String,
    version: Version,
    active: bool,
    optional: bool,
    match_mode: MatchMode,
    params: Vec<String>,
    source: Option<PathBuf>,
}

fn strings<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl PluginBuilder {
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn order(mut self, order: f64) -> Self {
        self.order = Some(order);
        self
    }

    /// Set or clear the order; an unset order fails shape validation.
    #[cfg(test)]
    pub(crate) fn order_opt(mut self, order: Option<f64>) -> Self {
        self.order = order;
        self
    }

    pub fn hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts = strings(hosts);
        self
    }

    pub fn families<I, S>(mut self, families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.families = strings(families);
        self
    }

    pub fn targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = strings(targets);
        self
    }

    pub fn requires(mut self, requires: impl Into<String>) -> Self {
        self.requires = requires.into();
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    pub fn params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = strings(params);
        self
    }

    pub fn source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    fn finish(self, constructor: Constructor) -> PluginClass {
        PluginClass {
            name: self.name,
            label: self.label,
            id: Uuid::new_v4(),
            category: self.category,
            order: self.order,
            hosts: self.hosts,
            families: self.families,
            targets: self.targets,
            requires: self.requires,
            version: self.version,
            active: self.active,
            optional: self.optional,
            match_mode: self.match_mode,
            params: self.params,
            source: self.source,
            constructor,
        }
    }

    pub fn build(self, factory: Factory) -> PluginClass {
        self.finish(Constructor::Current(factory))
    }

    /// Build with an infallible constructor.
    pub fn construct<P, F>(self, make: F) -> PluginClass
    where
        P: Plugin + 'static,
        F: Fn() -> P + Send + Sync + 'static,
    {
        self.build(Arc::new(move || Ok(Box::new(make()) as Box<dyn Plugin>)))
    }

    /// Build from a processing closure; each unit gets its own clone.
    pub fn process_fn<F>(self, process: F) -> PluginClass
    where
        F: Fn(&Arguments) -> Result<(), PluginError> + Clone + Send + Sync + 'static,
    {
        self.build(Arc::new(move || {
            Ok(Box::new(FnPlugin(process.clone())) as Box<dyn Plugin>)
        }))
    }

    pub fn build_legacy(self, factory: LegacyFactory) -> PluginClass {
        self.finish(Constructor::Legacy(factory))
    }

    /// Build a context-wide legacy class with an infallible constructor.
    pub fn legacy<L, F>(self, make: F) -> PluginClass
    where
        L: LegacyPlugin + 'static,
        F: Fn() -> L + Send + Sync + 'static,
    {
        self.build_legacy(Arc::new(move || Ok(Box::new(make()) as Box<dyn LegacyPlugin>)))
    }
}
