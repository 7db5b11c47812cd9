//! Publish Core: plug-in processing engine
//!
//! Discovers independently authored plug-ins, orders them, and runs them against an
//! in-memory [`Context`] of [`Instance`]s through the collect, validate, extract and
//! integrate phases. Every processed unit yields one [`PluginResult`]; one failing
//! plug-in never aborts the run, but a failed validation gates extraction.

pub mod api;
pub mod callbacks;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod logging;
pub mod logic;
pub mod model;
pub mod order;
pub mod plugin;
pub mod protocol;
pub mod provider;
pub mod registry;
pub mod util;

pub use callbacks::Callbacks;
pub use config::{ConfigLoader, PipelineConfig};
pub use engine::{Defer, Engine};
pub use error::{
    ConfigError, DataError, ErrorKind, PluginError, ProcessError, PublishError, RegistryError,
};
pub use logic::{instances_by_plugin, plugins_by_host, MatchMode, Units};
pub use model::{Context, Instance};
pub use order::Band;
pub use plugin::{Category, LegacyPlugin, Plugin, PluginClass};
pub use protocol::{commit, PluginResult, Publisher};
pub use provider::{Arguments, Provider};
pub use registry::Registry;

/// Version of the running framework, matched against each plug-in's `requires`.
pub const FRAMEWORK_VERSION: &str = env!("CARGO_PKG_VERSION");
