use super::result::{PluginResult, PluginSummary};
use crate::error::{PluginError, ProcessError};
use crate::logging::capture::{capture, replay};
use crate::logic::{instances_by_plugin, publishable_instances, IterOptions};
use crate::model::{Context, Instance};
use crate::plugin::{Constructor, LegacyPlugin, PluginClass};
use crate::provider::Provider;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, warn};

/// Process one unit.
///
/// A fresh plug-in object is built for the call. Construction failures, errors
/// and panics all end up on the returned result. A legacy class runs
/// `process_instance` when given an instance and `process_context` otherwise.
pub fn process(
    class: &PluginClass,
    provider: &Provider,
    context: &Context,
    instance: Option<&Instance>,
) -> PluginResult {
    match class.constructor() {
        Constructor::Current(factory) => run_step(class, instance.map(Instance::name), || {
            let mut plugin = factory().map_err(construction_failed)?;
            provider.invoke(plugin.as_mut(), class.params(), context, instance)
        }),
        Constructor::Legacy(factory) => run_step(class, instance.map(Instance::name), || {
            let mut plugin = factory().map_err(construction_failed)?;
            match instance {
                Some(instance) => plugin.process_instance(instance),
                None => plugin.process_context(context),
            }
        }),
    }
}

/// Process a legacy class for a whole pass.
///
/// One plug-in object handles the context step and then every compatible
/// instance. The first result covers the context step; when it failed, no
/// instance is processed. Each instance failure is reported on its own result.
pub fn process_legacy(class: &PluginClass, context: &Context, options: &IterOptions) -> Vec<PluginResult> {
    let Constructor::Legacy(factory) = class.constructor() else {
        return vec![process(class, &Provider::new(), context, None)];
    };

    let mut built: Option<Box<dyn LegacyPlugin>> = None;
    let context_result = run_step(class, None, || {
        let mut plugin = factory().map_err(construction_failed)?;
        let outcome = plugin.process_context(context);
        built = Some(plugin);
        outcome
    });

    let mut results = vec![context_result];
    let Some(mut plugin) = built.filter(|_| results[0].success) else {
        return results;
    };

    let candidates = publishable_instances(context, options.publish_by_default);
    for instance in instances_by_plugin(&candidates, class) {
        results.push(run_step(class, Some(instance.name()), || {
            plugin.process_instance(&instance)
        }));
    }
    results
}

/// Process one unit and return its first error instead of a failed result.
pub fn process_checked(
    class: &PluginClass,
    provider: &Provider,
    context: &Context,
    instance: Option<&Instance>,
) -> Result<PluginResult, ProcessError> {
    let result = process(class, provider, context, instance);
    match &result.error {
        Some(error) => Err(error.clone()),
        None => Ok(result),
    }
}

fn construction_failed(err: PluginError) -> PluginError {
    PluginError::construction(err.to_string())
}

fn run_step<F>(class: &PluginClass, instance: Option<String>, step: F) -> PluginResult
where
    F: FnOnce() -> Result<(), PluginError>,
{
    let span = tracing::info_span!(
        "plugin",
        plugin = %class.name(),
        instance = instance.as_deref().unwrap_or("-")
    );
    let _entered = span.enter();

    let started = Instant::now();
    let (outcome, records) = capture(|| guarded(step));
    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
    replay(&records, class.name());

    let error = match outcome {
        Ok(()) => {
            debug!(plugin = %class.name(), duration_ms, "Processed");
            None
        }
        Err(err) => {
            let captured = ProcessError::capture(&err, class.name(), instance.as_deref());
            warn!(plugin = %class.name(), error = %captured.message, "Plug-in failed");
            Some(captured)
        }
    };

    PluginResult {
        plugin: PluginSummary::from(class),
        instance,
        success: error.is_none(),
        records,
        duration_ms,
        error,
    }
}

fn guarded<F>(step: F) -> Result<(), PluginError>
where
    F: FnOnce() -> Result<(), PluginError>,
{
    match panic::catch_unwind(AssertUnwindSafe(step)) {
        Ok(outcome) => outcome,
        Err(payload) => Err(PluginError::panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
