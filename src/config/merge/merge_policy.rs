//! Defaults seeded beneath every other configuration layer

use crate::config::{
    default_collectors, default_date_format, default_extractors, default_integrators,
    default_paths_env, default_validators,
};
use crate::protocol::commit::{DEFAULT_PREFIX, DEFAULT_TEMPLATE};
use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Later sources replace whole values; lists such as `discovery.paths` are not
/// concatenated across layers.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("discovery.patterns.collectors", default_collectors())?
        .set_default("discovery.patterns.validators", default_validators())?
        .set_default("discovery.patterns.extractors", default_extractors())?
        .set_default("discovery.patterns.integrators", default_integrators())?
        .set_default("discovery.paths_env", default_paths_env())?
        .set_default("discovery.paths", Vec::<String>::new())?
        .set_default("commit.template", DEFAULT_TEMPLATE)?
        .set_default("commit.prefix", DEFAULT_PREFIX)?
        .set_default("date_format", default_date_format())?
        .set_default("publish_by_default", true)
}
