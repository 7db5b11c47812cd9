//! Error types for the publishing engine.
//!
//! Discovery problems are logged and never surface here except for caller misuse.
//! Processing problems travel as [`PluginError`] out of a plug-in and are captured
//! into a [`ProcessError`] on the result.

use serde::{Deserialize, Serialize};
use std::panic::Location;
use std::path::PathBuf;
use thiserror::Error;

/// Registry and discovery misuse
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Plug-in path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Plug-in path not registered: {0}")]
    PathNotRegistered(PathBuf),

    #[error("Unknown plug-in category: {0}")]
    UnknownCategory(String),

    #[error("Invalid plug-in {name}: {reason}")]
    InvalidPlugin { name: String, reason: String },

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Failed to load module {path}: {reason}")]
    Module { path: PathBuf, reason: String },

    #[error("{kind} not registered: {name}")]
    NotRegistered { kind: &'static str, name: String },
}

/// Context and instance data errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataError {
    #[error("Data key not found: {0}")]
    KeyNotFound(String),

    #[error("Instance not found: {0}")]
    InstanceNotFound(String),
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err.to_string())
    }
}

/// Errors raised while loading a single plug-in module during discovery
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Failed to read module: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse module: {0}")]
    Parse(String),

    #[error("Unknown plug-in factory: {0}")]
    UnknownFactory(String),

    #[error("Failed to load library: {0}")]
    Library(String),
}

/// What went wrong inside a plug-in
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("{0}")]
    Failed(String),

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Unresolved dependency: {0}")]
    Unresolved(String),

    #[error("Construction failed: {0}")]
    Construction(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("Plug-in panicked: {0}")]
    Panicked(String),
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Failed(_) => "failed",
            ErrorKind::MissingData(_) => "missing_data",
            ErrorKind::Unresolved(_) => "unresolved",
            ErrorKind::Construction(_) => "construction",
            ErrorKind::Io(_) => "io",
            ErrorKind::Data(_) => "data",
            ErrorKind::Panicked(_) => "panicked",
        }
    }
}

/// Error returned by a plug-in, tagged with the source location that raised it.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct PluginError {
    kind: ErrorKind,
    location: Option<&'static Location<'static>>,
}

impl PluginError {
    #[track_caller]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            location: Some(Location::caller()),
        }
    }

    #[track_caller]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Failed(message.into()))
    }

    #[track_caller]
    pub fn missing_data(key: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingData(key.into()))
    }

    #[track_caller]
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unresolved(name.into()))
    }

    #[track_caller]
    pub fn construction(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Construction(message.into()))
    }

    /// Panics carry no reliable raising frame.
    pub(crate) fn panicked(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Panicked(message.into()),
            location: None,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn location(&self) -> Option<&'static Location<'static>> {
        self.location
    }
}

impl From<std::io::Error> for PluginError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorKind::Io(err))
    }
}

impl From<DataError> for PluginError {
    #[track_caller]
    fn from(err: DataError) -> Self {
        Self::new(ErrorKind::Data(err))
    }
}

/// A plug-in error captured at the processing boundary.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[error("{plugin}: {message}")]
pub struct ProcessError {
    pub plugin: String,
    pub instance: Option<String>,
    pub kind: String,
    pub message: String,
    /// `file:line:column` of the raising frame, when known
    pub location: Option<String>,
    pub traceback: String,
}

impl ProcessError {
    pub(crate) fn capture(err: &PluginError, plugin: &str, instance: Option<&str>) -> Self {
        let message = err.to_string();
        let location = err
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
        let backtrace = std::backtrace::Backtrace::capture();

        let mut traceback = format!("Plug-in '{}'", plugin);
        if let Some(instance) = instance {
            traceback.push_str(&format!(" on instance '{}'", instance));
        }
        match &location {
            Some(location) => traceback.push_str(&format!(" raised at {}\n", location)),
            None => traceback.push_str(" raised\n"),
        }
        traceback.push_str(&format!("{}: {}\n", err.kind().name(), message));
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            traceback.push_str(&backtrace.to_string());
        }

        Self {
            plugin: plugin.to_string(),
            instance: instance.map(str::to_string),
            kind: err.kind().name().to_string(),
            message,
            location,
            traceback,
        }
    }
}

/// Failure of a checked publish: discovery misuse or the first captured plug-in error
#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Process(#[from] ProcessError),
}
