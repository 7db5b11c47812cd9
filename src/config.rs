//! Configuration System
//!
//! Layered configuration for discovery patterns, the commit template, date
//! formatting and logging. Loaded by [`ConfigLoader`] and consumed read-only.

use crate::plugin::Category;
use chrono::format::{Item, StrftimeItems};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use crate::logging::LoggingConfig;
pub use crate::protocol::CommitSettings;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::user_file::user_config_path;

/// Environment variable naming an extra configuration file
pub const CONFIG_FILE_ENV: &str = "PUBLISH_CONFIG";

/// Prefix of environment overrides, e.g. `PUBLISH__PUBLISH_BY_DEFAULT=false`
pub const ENV_PREFIX: &str = "PUBLISH";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub commit: CommitSettings,

    /// chrono format of the session `date`
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Whether instances without a `publish` flag are processed
    #[serde(default = "default_true")]
    pub publish_by_default: bool,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub patterns: PatternConfig,

    /// Environment variable holding extra plug-in paths
    #[serde(default = "default_paths_env")]
    pub paths_env: String,

    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

/// File-stem patterns deciding which category a module belongs to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternConfig {
    #[serde(default = "default_collectors")]
    pub collectors: String,
    #[serde(default = "default_validators")]
    pub validators: String,
    #[serde(default = "default_extractors")]
    pub extractors: String,
    #[serde(default = "default_integrators")]
    pub integrators: String,
}

pub(crate) fn default_date_format() -> String {
    "%Y%m%dT%H%M%SZ".to_string()
}

fn default_true() -> bool {
    true
}

pub(crate) fn default_paths_env() -> String {
    "PUBLISH_PLUGIN_PATH".to_string()
}

pub(crate) fn default_collectors() -> String {
    "^(select|collect)_".to_string()
}

pub(crate) fn default_validators() -> String {
    "^validate_".to_string()
}

pub(crate) fn default_extractors() -> String {
    "^extract_".to_string()
}

pub(crate) fn default_integrators() -> String {
    "^(conform|integrate)_".to_string()
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            collectors: default_collectors(),
            validators: default_validators(),
            extractors: default_extractors(),
            integrators: default_integrators(),
        }
    }
}

impl PatternConfig {
    pub fn for_category(&self, category: Category) -> &str {
        match category {
            Category::Collector => &self.collectors,
            Category::Validator => &self.validators,
            Category::Extractor => &self.extractors,
            Category::Integrator => &self.integrators,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            patterns: PatternConfig::default(),
            paths_env: default_paths_env(),
            paths: Vec::new(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            commit: CommitSettings::default(),
            date_format: default_date_format(),
            publish_by_default: true,
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Pattern(Category, String),
    Commit(String),
    DateFormat(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Pattern(category, msg) => {
                write!(f, "Pattern for {}s: {}", category, msg)
            }
            ValidationError::Commit(msg) => write!(f, "Commit template: {}", msg),
            ValidationError::DateFormat(msg) => write!(f, "Date format: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl PipelineConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for category in Category::ALL {
            if let Err(e) = Regex::new(self.discovery.patterns.for_category(category)) {
                errors.push(ValidationError::Pattern(category, e.to_string()));
            }
        }

        if self.commit.template.trim().is_empty() {
            errors.push(ValidationError::Commit("template cannot be empty".to_string()));
        }

        if self.date_format.is_empty()
            || StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error))
        {
            errors.push(ValidationError::DateFormat(format!(
                "'{}' is not a valid strftime format",
                self.date_format
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
