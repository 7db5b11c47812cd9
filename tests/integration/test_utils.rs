//! Shared test utilities for integration tests
//!
//! Centralizes the environment guard and the plug-in builders most tests need.

use parking_lot::Mutex as LogMutex;
use publish_core::plugin::Factory;
use publish_core::{Category, Plugin, PluginClass, PluginError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Serializes access to environment variables and the process registry
static GLOBAL_MUTEX: Mutex<()> = Mutex::new(());

pub fn global_lock() -> MutexGuard<'static, ()> {
    GLOBAL_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
}

/// Run `f` with `vars` set (or removed, for `None`), restoring the previous values
/// afterwards.
pub fn with_env<F, R>(vars: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = global_lock();
    let saved: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(key, _)| (key.to_string(), std::env::var(key).ok()))
        .collect();

    for (key, value) in vars {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }

    let result = f();

    for (key, value) in saved {
        match value {
            Some(value) => std::env::set_var(&key, value),
            None => std::env::remove_var(&key),
        }
    }

    result
}

/// Shared log of plug-in names in processing order
pub type CallLog = Arc<LogMutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(LogMutex::new(Vec::new()))
}

/// A plug-in that records its name and optionally fails.
pub fn recording(name: &str, category: Category, order: f64, fail: bool, log: &CallLog) -> PluginClass {
    let log = Arc::clone(log);
    let label = name.to_string();
    PluginClass::builder(name, category)
        .order(order)
        .hosts(["*"])
        .families(["*"])
        .process_fn(move |_| {
            log.lock().push(label.clone());
            if fail {
                return Err(PluginError::failed(format!("{} failed", label)));
            }
            Ok(())
        })
}

struct Noop;

impl Plugin for Noop {
    fn process(&mut self, _args: &publish_core::Arguments) -> Result<(), PluginError> {
        Ok(())
    }
}

pub fn noop_factory() -> Factory {
    Arc::new(|| Ok::<_, PluginError>(Box::new(Noop) as Box<dyn Plugin>))
}

/// Write a module manifest into `dir` and return its path.
pub fn write_module(dir: &Path, file_name: &str, body: &str) -> PathBuf {
    let path = dir.join(file_name);
    fs::write(&path, body).unwrap();
    path
}
