//! Named-signal bus
//!
//! Listeners are held weakly: the registrant keeps the [`Callback`] alive, and a
//! dropped listener is pruned on the next emit of its signal.

use crate::error::RegistryError;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Listener called with the signal name and its payload.
pub type Callback = Arc<dyn Fn(&str, &Value) + Send + Sync>;

type WeakCallback = Weak<dyn Fn(&str, &Value) + Send + Sync>;

pub const SIGNAL_PLUGIN_PROCESSED: &str = "plugin_processed";
pub const SIGNAL_COLLECTED: &str = "collected";
pub const SIGNAL_VALIDATED: &str = "validated";
pub const SIGNAL_EXTRACTED: &str = "extracted";
pub const SIGNAL_INTEGRATED: &str = "integrated";
pub const SIGNAL_PUBLISHED: &str = "published";
pub const SIGNAL_ENGINE_RESET: &str = "engine_reset";
pub const SIGNAL_ENGINE_STOPPED: &str = "engine_stopped";
pub const SIGNAL_ENGINE_FINISHED: &str = "engine_finished";

#[derive(Clone, Default)]
pub struct Callbacks {
    inner: Arc<RwLock<BTreeMap<String, Vec<WeakCallback>>>>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, signal: impl Into<String>, callback: &Callback) {
        let mut listeners = self.inner.write();
        let entry = listeners.entry(signal.into()).or_default();
        let weak = Arc::downgrade(callback);
        if !entry.iter().any(|existing| existing.ptr_eq(&weak)) {
            entry.push(weak);
        }
    }

    pub fn deregister(&self, signal: &str, callback: &Callback) -> Result<(), RegistryError> {
        let mut listeners = self.inner.write();
        let weak = Arc::downgrade(callback);
        let entry = listeners.get_mut(signal).ok_or_else(|| not_registered(signal))?;
        let before = entry.len();
        entry.retain(|existing| !existing.ptr_eq(&weak));
        if entry.len() == before {
            return Err(not_registered(signal));
        }
        if entry.is_empty() {
            listeners.remove(signal);
        }
        Ok(())
    }

    /// Live listener count per signal.
    pub fn registered(&self) -> BTreeMap<String, usize> {
        self.inner
            .read()
            .iter()
            .map(|(signal, entry)| {
                let live = entry.iter().filter(|w| w.strong_count() > 0).count();
                (signal.clone(), live)
            })
            .filter(|(_, live)| *live > 0)
            .collect()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Call every live listener of `signal`.
    ///
    /// A panicking listener is logged and does not stop the others.
    pub fn emit(&self, signal: &str, payload: &Value) {
        let live: Vec<Callback> = {
            let mut listeners = self.inner.write();
            let Some(entry) = listeners.get_mut(signal) else {
                return;
            };
            entry.retain(|w| w.strong_count() > 0);
            entry.iter().filter_map(Weak::upgrade).collect()
        };

        debug!(signal, listeners = live.len(), "Emitting");
        for callback in live {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(signal, payload)));
            if outcome.is_err() {
                warn!(signal, "Callback panicked");
            }
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("signals", &self.registered())
            .finish()
    }
}

fn not_registered(signal: &str) -> RegistryError {
    RegistryError::NotRegistered {
        kind: "Callback",
        name: signal.to_string(),
    }
}
