//! Environment-pointed config file source: the file named by PUBLISH_CONFIG

use crate::config::CONFIG_FILE_ENV;
use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::PathBuf;

/// Add the file named by `PUBLISH_CONFIG`. A named file that does not exist is an error.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    match std::env::var_os(CONFIG_FILE_ENV) {
        Some(value) if !value.is_empty() => {
            let path = PathBuf::from(value);
            Ok(builder.add_source(File::from(path.as_path()).required(true)))
        }
        _ => Ok(builder),
    }
}
