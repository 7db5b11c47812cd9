use super::process::{process, process_legacy};
use super::result::PluginResult;
use crate::callbacks::{Callbacks, SIGNAL_PLUGIN_PROCESSED};
use crate::logic::{default_abort_test, AbortTest, IterOptions, Units};
use crate::model::Context;
use crate::plugin::PluginClass;
use crate::provider::Provider;
use std::collections::VecDeque;
use tracing::{info, warn};

/// Lazy stream of results for one publish pass.
///
/// Before each unit the abort test sees the unit's order and the orders of every
/// failure so far; once it objects, the stream ends. Every result is appended to
/// the context's result log and announced as `plugin_processed`.
pub struct Publisher {
    units: Units,
    options: IterOptions,
    provider: Provider,
    test: AbortTest,
    callbacks: Callbacks,
    until: Option<f64>,
    orders_with_error: Vec<f64>,
    pending: VecDeque<PluginResult>,
    aborted: Option<String>,
}

impl Publisher {
    pub fn new(plugins: Vec<PluginClass>, context: &Context, options: IterOptions) -> Self {
        Self {
            units: Units::with_options(plugins, context, options.clone()),
            options,
            provider: Provider::with_defaults(),
            test: default_abort_test(),
            callbacks: Callbacks::new(),
            until: None,
            orders_with_error: Vec::new(),
            pending: VecDeque::new(),
            aborted: None,
        }
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_test(mut self, test: AbortTest) -> Self {
        self.test = test;
        self
    }

    pub fn with_callbacks(mut self, callbacks: Callbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Stop before the first unit whose order reaches `bound`.
    pub fn until(mut self, bound: f64) -> Self {
        self.until = Some(bound);
        self
    }

    /// Failures from an earlier pass over the same context, seen by the abort test.
    pub fn with_prior_errors(mut self, orders: impl IntoIterator<Item = f64>) -> Self {
        self.orders_with_error.extend(orders);
        self
    }

    pub fn context(&self) -> &Context {
        self.units.context()
    }

    /// Order of the next unit, if there is one within bounds.
    pub fn peek_order(&mut self) -> Option<f64> {
        if self.aborted.is_some() {
            return None;
        }
        let order = self.units.peek()?.order();
        match self.until {
            Some(bound) if order >= bound => None,
            _ => Some(order),
        }
    }

    /// Reason the abort test gave, once it stopped the stream.
    pub fn aborted(&self) -> Option<&str> {
        self.aborted.as_deref()
    }

    pub fn orders_with_error(&self) -> &[f64] {
        &self.orders_with_error
    }

    /// Process the next unit and return all of its results.
    ///
    /// A legacy plug-in contributes one result for its context step plus one per
    /// instance; every other unit contributes exactly one.
    pub fn next_unit(&mut self) -> Option<Vec<PluginResult>> {
        let order = self.peek_order()?;
        if let Some(reason) = (self.test)(order, &self.orders_with_error) {
            warn!(order, reason = %reason, "Stopping publish");
            self.aborted = Some(reason);
            return None;
        }

        let unit = self.units.next()?;
        let context = self.units.context().clone();
        let results = if unit.plugin.is_legacy() && unit.instance.is_none() {
            process_legacy(&unit.plugin, &context, &self.options)
        } else {
            vec![process(&unit.plugin, &self.provider, &context, unit.instance.as_ref())]
        };

        for result in &results {
            self.record(&context, result);
        }
        Some(results)
    }

    fn record(&mut self, context: &Context, result: &PluginResult) {
        let summary = result.to_value();
        context.append_result(summary.clone());
        if !result.success {
            self.orders_with_error.push(result.order());
        }
        info!(
            plugin = %result.plugin.name,
            instance = result.instance.as_deref().unwrap_or("-"),
            success = result.success,
            "Unit processed"
        );
        self.callbacks.emit(SIGNAL_PLUGIN_PROCESSED, &summary);
    }
}

impl Iterator for Publisher {
    type Item = PluginResult;

    fn next(&mut self) -> Option<PluginResult> {
        loop {
            if let Some(result) = self.pending.pop_front() {
                return Some(result);
            }
            let batch = self.next_unit()?;
            self.pending.extend(batch);
        }
    }
}
