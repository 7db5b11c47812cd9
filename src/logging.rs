//! Logging
//!
//! The engine only writes through `tracing`; it never installs a subscriber on its
//! own. Hosts and command-line front ends call [`init_logging`] once at startup.
//! Per-invocation capture of plug-in log records lives in [`capture`].

pub mod capture;

pub use capture::{capture, LogRecord};

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter directives, overriding `level` and `targets`
pub const LOG_ENV: &str = "PUBLISH_LOG";
pub const LOG_FORMAT_ENV: &str = "PUBLISH_LOG_FORMAT";
pub const LOG_OUTPUT_ENV: &str = "PUBLISH_LOG_OUTPUT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::Invalid(format!(
                "log format '{}' is neither 'text' nor 'json'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    #[default]
    Stderr,
    File,
}

impl FromStr for LogOutput {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            "file" => Ok(LogOutput::File),
            other => Err(ConfigError::Invalid(format!(
                "log output '{}' must be stdout, stderr or file",
                other
            ))),
        }
    }
}

/// `[logging]` section of the pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base filter: a level such as `info`, or `off`
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Destination when `output = "file"`
    pub file: PathBuf,
    /// ANSI colors for text written to a terminal stream
    pub color: bool,
    /// Per-target levels, e.g. `"publish_core::registry" = "debug"`
    pub targets: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            output: LogOutput::Stderr,
            file: PathBuf::from("publish.log"),
            color: true,
            targets: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    /// This configuration with `PUBLISH_LOG_FORMAT` and `PUBLISH_LOG_OUTPUT` applied.
    fn with_env_overrides(&self) -> Result<Self, ConfigError> {
        let mut effective = self.clone();
        if let Ok(format) = std::env::var(LOG_FORMAT_ENV) {
            effective.format = format.parse()?;
        }
        if let Ok(output) = std::env::var(LOG_OUTPUT_ENV) {
            effective.output = output.parse()?;
        }
        Ok(effective)
    }

    /// Filter from `PUBLISH_LOG` when set, else from `level` and `targets`.
    fn filter(&self) -> Result<EnvFilter, ConfigError> {
        if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
            return Ok(filter);
        }

        let mut filter = EnvFilter::try_new(&self.level)
            .map_err(|e| ConfigError::Invalid(format!("log level '{}': {}", self.level, e)))?;
        for (target, level) in &self.targets {
            let directive = format!("{}={}", target, level)
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("log target '{}': {}", target, e)))?;
            filter = filter.add_directive(directive);
        }
        Ok(filter)
    }

    fn writer(&self) -> Result<BoxMakeWriter, ConfigError> {
        Ok(match self.output {
            LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
            LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
            LogOutput::File => BoxMakeWriter::new(Mutex::new(open_append(&self.file)?)),
        })
    }
}

/// Install the global subscriber.
///
/// The environment wins over `config`, which wins over the defaults. Fails when a
/// global subscriber is already installed.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ConfigError> {
    let config = config.cloned().unwrap_or_default().with_env_overrides()?;
    let filter = config.filter()?;
    let writer = config.writer()?;
    let ansi = config.color && config.output != LogOutput::File;

    let registry = Registry::default().with(filter);
    let installed = match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init(),
    };

    installed.map_err(|e| ConfigError::Invalid(format!("logging already initialized: {}", e)))
}

fn open_append(path: &Path) -> Result<fs::File, ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("log directory {}: {}", parent.display(), e)))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ConfigError::Invalid(format!("log file {}: {}", path.display(), e)))
}
