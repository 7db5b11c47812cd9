//! Extractor commit: move a finished temporary directory to its published home
//!
//! The destination comes from a path template. Every token must resolve; a
//! missing date or workspace root fails the extractor instead of guessing.

use crate::error::PluginError;
use crate::model::{Context, Instance};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

pub const DEFAULT_TEMPLATE: &str = "{root}/{prefix}/{date}/{family}/{user}/{instance}";
pub const DEFAULT_PREFIX: &str = "published";

/// Instance key the destination is written back to
pub const KEY_COMMIT_DIR: &str = "commit_dir";
pub const KEY_WORKSPACE_DIR: &str = "workspace_dir";
pub const KEY_DATE: &str = "date";
pub const KEY_USER: &str = "user";
/// Context key holding the session's configured [`CommitSettings`]
pub const KEY_COMMIT_SETTINGS: &str = "commit_settings";

const TOKEN_PATTERN: &str = r"\{(\w+)\}";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitSettings {
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

impl Default for CommitSettings {
    fn default() -> Self {
        Self {
            template: default_template(),
            prefix: default_prefix(),
        }
    }
}

impl CommitSettings {
    /// Settings stored on the instance's context when the session was prepared,
    /// or the defaults for a context that was never prepared.
    pub fn for_instance(instance: &Instance) -> Result<Self, PluginError> {
        let stored = instance
            .context()
            .and_then(|context| context.data(KEY_COMMIT_SETTINGS))
            .filter(|value| !value.is_null());
        match stored {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                PluginError::failed(format!("Invalid {}: {}", KEY_COMMIT_SETTINGS, e))
            }),
            None => Ok(Self::default()),
        }
    }
}

/// [`commit`] with the settings configured for the instance's session.
pub fn commit_configured(source: &Path, instance: &Instance) -> Result<PathBuf, PluginError> {
    let settings = CommitSettings::for_instance(instance)?;
    commit(source, instance, &settings)
}

/// Copy `source` into the instance's commit directory and record it under
/// `commit_dir`.
///
/// An existing destination is merged into file by file; nothing already there is
/// removed.
pub fn commit(source: &Path, instance: &Instance, settings: &CommitSettings) -> Result<PathBuf, PluginError> {
    if !source.is_dir() {
        return Err(PluginError::failed(format!(
            "Commit source is not a directory: {}",
            source.display()
        )));
    }

    let destination = commit_path(instance, settings)?;
    if destination.starts_with(source) {
        return Err(PluginError::failed(format!(
            "Commit destination {} lies inside its source {}",
            destination.display(),
            source.display()
        )));
    }
    if destination.exists() {
        debug!(destination = %destination.display(), "Merging into existing commit directory");
    } else {
        fs::create_dir_all(&destination)?;
    }
    copy_tree(source, &destination)?;

    info!(
        instance = %instance.name(),
        destination = %destination.display(),
        "Committed"
    );
    instance.set_data(KEY_COMMIT_DIR, destination.to_string_lossy().into_owned());
    Ok(destination)
}

/// Destination directory for `instance` under `settings`.
pub fn commit_path(instance: &Instance, settings: &CommitSettings) -> Result<PathBuf, PluginError> {
    let context = instance.context();
    let tokens = Regex::new(TOKEN_PATTERN).map_err(|e| PluginError::failed(e.to_string()))?;

    let mut rendered = String::with_capacity(settings.template.len());
    let mut last = 0;
    for captures in tokens.captures_iter(&settings.template) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        rendered.push_str(&settings.template[last..whole.start()]);
        rendered.push_str(&token_value(name.as_str(), instance, context.as_ref(), settings)?);
        last = whole.end();
    }
    rendered.push_str(&settings.template[last..]);

    Ok(PathBuf::from(rendered))
}

fn token_value(
    token: &str,
    instance: &Instance,
    context: Option<&Context>,
    settings: &CommitSettings,
) -> Result<String, PluginError> {
    match token {
        "root" => lookup(KEY_WORKSPACE_DIR, instance, context)
            .ok_or_else(|| PluginError::missing_data(KEY_WORKSPACE_DIR)),
        "prefix" => Ok(settings.prefix.clone()),
        "date" => lookup(KEY_DATE, instance, context).ok_or_else(|| PluginError::missing_data(KEY_DATE)),
        "family" => instance
            .family()
            .ok_or_else(|| PluginError::missing_data("family")),
        "user" => lookup(KEY_USER, instance, context).ok_or_else(|| PluginError::missing_data(KEY_USER)),
        "instance" => Ok(instance.name()),
        other => Err(PluginError::failed(format!(
            "Unknown commit template token: {{{}}}",
            other
        ))),
    }
}

/// Instance data first, then the owning context.
fn lookup(key: &str, instance: &Instance, context: Option<&Context>) -> Option<String> {
    instance
        .data(key)
        .or_else(|| context.and_then(|c| c.data(key)))
        .and_then(|value| match value {
            Value::String(text) => Some(text),
            Value::Null => None,
            other => Some(other.to_string()),
        })
}

fn copy_tree(source: &Path, destination: &Path) -> Result<(), PluginError> {
    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| PluginError::failed(e.to_string()))?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
