//! Configuration loader facade

use super::merge::merge_policy;
use super::sources::{env_file, user_file};
use super::{PipelineConfig, ENV_PREFIX};
use crate::error::ConfigError;
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use std::path::Path;
use tracing::debug;

/// Loads [`PipelineConfig`], lowest to highest precedence:
/// defaults, user file, `PUBLISH_CONFIG` file, `PUBLISH__*` environment.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load() -> Result<PipelineConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = user_file::add_to_builder(builder)?;
        let builder = env_file::add_to_builder(builder)?;
        Self::finish(builder)
    }

    /// Defaults, then `path`, then the environment.
    pub fn load_from_file(path: &Path) -> Result<PipelineConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true));
        Self::finish(builder)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<PipelineConfig, ConfigError> {
        let config: PipelineConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("discovery.paths"),
            )
            .build()?
            .try_deserialize()?;

        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ConfigError::Invalid(messages.join("\n"))
        })?;

        debug!(
            publish_by_default = config.publish_by_default,
            paths = config.discovery.paths.len(),
            "Configuration loaded"
        );
        Ok(config)
    }
}
