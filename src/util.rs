//! One-call publishing
//!
//! Wrappers that prepare a context, discover plug-ins when none are given, run them
//! and announce the outcome. `collect`, `validate`, `extract` and `integrate` each
//! run a single order band, so a session can be driven one phase at a time; the
//! failures logged on the context by earlier phases still gate later ones.

use crate::callbacks::{
    SIGNAL_COLLECTED, SIGNAL_EXTRACTED, SIGNAL_INTEGRATED, SIGNAL_PUBLISHED, SIGNAL_VALIDATED,
};
use crate::config::PipelineConfig;
use crate::error::{PublishError, RegistryError};
use crate::model::{Context, KEY_RESULTS};
use crate::order::Band;
use crate::plugin::PluginClass;
use crate::protocol::commit::{KEY_COMMIT_SETTINGS, KEY_DATE, KEY_USER};
use crate::protocol::{PluginResult, Publisher};
use crate::provider::current_user;
use crate::registry::Registry;
use chrono::Utc;
use serde_json::{json, Value};
use std::fmt::Write;
use tracing::{info, warn};

pub const KEY_CURRENT_DIR: &str = "current_dir";

/// Fill in the session data plug-ins commonly rely on. Existing values are kept.
pub fn prepare_context(context: &Context, config: &PipelineConfig) {
    if !context.has_data(KEY_DATE) {
        let mut date = String::new();
        if write!(date, "{}", Utc::now().format(&config.date_format)).is_err() {
            warn!(format = %config.date_format, "Invalid date format, using RFC 3339");
            date = Utc::now().to_rfc3339();
        }
        context.set_data(KEY_DATE, date);
    }
    if !context.has_data(KEY_USER) {
        context.set_data(KEY_USER, current_user());
    }
    if !context.has_data(KEY_CURRENT_DIR) {
        if let Ok(dir) = std::env::current_dir() {
            context.set_data(KEY_CURRENT_DIR, dir.to_string_lossy().into_owned());
        }
    }
    if !context.has_data(KEY_COMMIT_SETTINGS) {
        match serde_json::to_value(&config.commit) {
            Ok(settings) => context.set_data(KEY_COMMIT_SETTINGS, settings),
            Err(e) => warn!(error = %e, "Could not store commit settings on the context"),
        }
    }
    if !context.has_data(KEY_RESULTS) {
        context.set_data(KEY_RESULTS, Value::Array(Vec::new()));
    }
}

/// Lazy result stream over `plugins`, or over everything the registry discovers.
pub fn publish_iter(
    registry: &Registry,
    context: &Context,
    plugins: Option<Vec<PluginClass>>,
) -> Result<Publisher, RegistryError> {
    prepare_context(context, registry.config());
    let plugins = match plugins {
        Some(plugins) => plugins,
        None => registry.discover(None, None, None)?,
    };
    Ok(registry.publisher(plugins, context))
}

/// Run every phase and return all results.
pub fn publish(
    registry: &Registry,
    context: &Context,
    plugins: Option<Vec<PluginClass>>,
) -> Result<Vec<PluginResult>, RegistryError> {
    let mut stream = publish_iter(registry, context, plugins)?;
    let results: Vec<PluginResult> = stream.by_ref().collect();
    announce(registry, SIGNAL_PUBLISHED, &results, stream.aborted());
    Ok(results)
}

/// Like [`publish`], but stop at the first failure and return it as an error.
pub fn publish_checked(
    registry: &Registry,
    context: &Context,
    plugins: Option<Vec<PluginClass>>,
) -> Result<Vec<PluginResult>, PublishError> {
    let stream = publish_iter(registry, context, plugins)?;
    let mut results = Vec::new();
    for result in stream {
        if let Some(error) = &result.error {
            return Err(PublishError::Process(error.clone()));
        }
        results.push(result);
    }
    announce(registry, SIGNAL_PUBLISHED, &results, None);
    Ok(results)
}

pub fn collect(
    registry: &Registry,
    context: &Context,
    plugins: Option<Vec<PluginClass>>,
) -> Result<Vec<PluginResult>, RegistryError> {
    run_band(registry, context, plugins, Band::Collection, SIGNAL_COLLECTED)
}

pub fn validate(
    registry: &Registry,
    context: &Context,
    plugins: Option<Vec<PluginClass>>,
) -> Result<Vec<PluginResult>, RegistryError> {
    run_band(registry, context, plugins, Band::Validation, SIGNAL_VALIDATED)
}

pub fn extract(
    registry: &Registry,
    context: &Context,
    plugins: Option<Vec<PluginClass>>,
) -> Result<Vec<PluginResult>, RegistryError> {
    run_band(registry, context, plugins, Band::Extraction, SIGNAL_EXTRACTED)
}

pub fn integrate(
    registry: &Registry,
    context: &Context,
    plugins: Option<Vec<PluginClass>>,
) -> Result<Vec<PluginResult>, RegistryError> {
    run_band(registry, context, plugins, Band::Integration, SIGNAL_INTEGRATED)
}

fn run_band(
    registry: &Registry,
    context: &Context,
    plugins: Option<Vec<PluginClass>>,
    band: Band,
    signal: &str,
) -> Result<Vec<PluginResult>, RegistryError> {
    prepare_context(context, registry.config());
    let plugins = match plugins {
        Some(plugins) => plugins,
        None => registry.discover(None, None, None)?,
    };
    let in_band: Vec<PluginClass> = plugins
        .into_iter()
        .filter(|class| Band::of(class.sort_order()) == band)
        .collect();

    let mut stream = registry
        .publisher(in_band, context)
        .with_prior_errors(prior_errors(context));
    let results: Vec<PluginResult> = stream.by_ref().collect();
    announce(registry, signal, &results, stream.aborted());
    Ok(results)
}

/// Orders of the failures already logged on the context.
fn prior_errors(context: &Context) -> Vec<f64> {
    let Some(Value::Array(entries)) = context.data(KEY_RESULTS) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter(|entry| entry.get("success").and_then(Value::as_bool) == Some(false))
        .filter_map(|entry| entry.pointer("/plugin/order").and_then(Value::as_f64))
        .collect()
}

fn announce(registry: &Registry, signal: &str, results: &[PluginResult], aborted: Option<&str>) {
    let failed = results.iter().filter(|result| !result.success).count();
    info!(
        signal,
        results = results.len(),
        failed,
        aborted = aborted.is_some(),
        "Publish pass finished"
    );
    registry.emit(
        signal,
        &json!({
            "results": results.len(),
            "failed": failed,
            "aborted": aborted,
        }),
    );
}
