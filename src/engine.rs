//! Stateful, cooperatively stepped publishing
//!
//! The engine drives a [`Publisher`] one unit at a time for interactive hosts. Each
//! unit is scheduled through a [`Defer`] hook: `Immediate` runs the whole pass in
//! the calling thread, `Scheduled` hands every unit to the host's event loop so the
//! host stays responsive in between. Stopping only prevents the next unit from
//! being scheduled; a unit that already started always completes.

use crate::callbacks::{
    Callbacks, SIGNAL_ENGINE_FINISHED, SIGNAL_ENGINE_RESET, SIGNAL_ENGINE_STOPPED,
};
use crate::error::RegistryError;
use crate::model::Context;
use crate::order::Band;
use crate::plugin::PluginClass;
use crate::protocol::{PluginResult, Publisher};
use crate::registry::Registry;
use crate::util::prepare_context;
use parking_lot::Mutex;
use serde_json::json;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Deferred unit of engine work
pub type Task = Box<dyn FnOnce() + Send>;

/// Host hook that runs a [`Task`] later, typically on its event loop.
pub type Scheduler = Arc<dyn Fn(Task) + Send + Sync>;

#[derive(Clone, Default)]
pub enum Defer {
    /// Run every unit synchronously in the calling thread.
    #[default]
    Immediate,
    Scheduled(Scheduler),
}

impl fmt::Debug for Defer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Defer::Immediate => f.write_str("Immediate"),
            Defer::Scheduled(_) => f.write_str("Scheduled(..)"),
        }
    }
}

struct EngineState {
    registry: Registry,
    context: Context,
    publisher: Option<Publisher>,
    results: Vec<PluginResult>,
    /// Bumped by every reset so a unit finishing afterwards is discarded.
    generation: u64,
}

#[derive(Clone)]
pub struct Engine {
    state: Arc<Mutex<EngineState>>,
    running: Arc<AtomicBool>,
    callbacks: Callbacks,
    defer: Defer,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("running", &self.is_running())
            .field("defer", &self.defer)
            .finish()
    }
}

impl Engine {
    pub fn new(registry: Registry) -> Self {
        let callbacks = registry.callbacks().clone();
        Self {
            state: Arc::new(Mutex::new(EngineState {
                registry,
                context: Context::new(),
                publisher: None,
                results: Vec::new(),
                generation: 0,
            })),
            running: Arc::new(AtomicBool::new(false)),
            callbacks,
            defer: Defer::Immediate,
        }
    }

    pub fn with_defer(mut self, defer: Defer) -> Self {
        self.defer = defer;
        self
    }

    /// Start a fresh session over everything the registry discovers.
    pub fn reset(&self) -> Result<(), RegistryError> {
        let plugins = self.state.lock().registry.discover(None, None, None)?;
        self.reset_with(plugins);
        Ok(())
    }

    /// Start a fresh session over `plugins`.
    pub fn reset_with(&self, plugins: Vec<PluginClass>) {
        self.running.store(false, Ordering::SeqCst);
        let count = plugins.len();
        {
            let mut state = self.state.lock();
            let context = Context::new();
            prepare_context(&context, state.registry.config());
            state.publisher = Some(state.registry.publisher(plugins, &context));
            state.context = context;
            state.results.clear();
            state.generation += 1;
        }
        info!(plugins = count, "Engine reset");
        self.callbacks
            .emit(SIGNAL_ENGINE_RESET, &json!({ "plugins": count }));
    }

    /// Run up to the end of collection.
    pub fn collect(&self) {
        self.run(Band::Collection.upper_bound());
    }

    /// Run up to the end of validation.
    pub fn validate(&self) {
        self.run(Band::Validation.upper_bound());
    }

    /// Run to completion.
    pub fn publish(&self) {
        self.run(f64::INFINITY);
    }

    /// Process exactly the next unit, whatever phase it belongs to.
    pub fn step(&self) -> Option<Vec<PluginResult>> {
        self.process_next(f64::INFINITY)
    }

    /// Skip scheduling of any further unit.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Engine stopped");
            self.callbacks.emit(SIGNAL_ENGINE_STOPPED, &json!({}));
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn results(&self) -> Vec<PluginResult> {
        self.state.lock().results.clone()
    }

    pub fn context(&self) -> Context {
        self.state.lock().context.clone()
    }

    fn run(&self, bound: f64) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Engine is already running");
            return;
        }
        self.schedule(bound);
    }

    fn schedule(&self, bound: f64) {
        match &self.defer {
            Defer::Immediate => while self.tick(bound) {},
            Defer::Scheduled(scheduler) => {
                let engine = self.clone();
                scheduler(Box::new(move || {
                    if engine.tick(bound) {
                        engine.schedule(bound);
                    }
                }));
            }
        }
    }

    /// Process one unit if still running; returns whether another should follow.
    fn tick(&self, bound: f64) -> bool {
        if !self.is_running() {
            return false;
        }
        match self.process_next(bound) {
            Some(_) => true,
            None => {
                self.finish();
                false
            }
        }
    }

    /// The publisher is taken out of the state while a unit runs so plug-ins and
    /// callbacks can query the engine.
    fn process_next(&self, bound: f64) -> Option<Vec<PluginResult>> {
        let (mut publisher, generation) = {
            let mut state = self.state.lock();
            let generation = state.generation;
            (state.publisher.take()?, generation)
        };

        let batch = match publisher.peek_order() {
            Some(order) if order < bound => publisher.next_unit(),
            _ => None,
        };

        let mut state = self.state.lock();
        if state.generation != generation {
            debug!("Discarding unit finished after reset");
            return None;
        }
        state.publisher = Some(publisher);
        if let Some(batch) = &batch {
            state.results.extend(batch.iter().cloned());
        }
        batch
    }

    fn finish(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let (results, failed, aborted) = {
            let state = self.state.lock();
            let failed = state.results.iter().filter(|r| !r.success).count();
            let aborted = state
                .publisher
                .as_ref()
                .and_then(|p| p.aborted().map(str::to_string));
            (state.results.len(), failed, aborted)
        };
        info!(results, failed, "Engine finished");
        self.callbacks.emit(
            SIGNAL_ENGINE_FINISHED,
            &json!({ "results": results, "failed": failed, "aborted": aborted }),
        );
    }
}
