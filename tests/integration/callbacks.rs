//! Signals announced during publishing

use crate::integration::test_utils::{call_log, recording};
use parking_lot::Mutex;
use publish_core::callbacks::{Callback, SIGNAL_PLUGIN_PROCESSED, SIGNAL_VALIDATED};
use publish_core::util::validate;
use publish_core::{Category, Context, Registry};
use serde_json::Value;
use std::sync::Arc;

#[test]
fn test_each_result_and_the_phase_are_announced() {
    let log = call_log();
    let registry = Registry::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let listener: Callback = Arc::new(move |signal: &str, payload: &Value| {
        sink.lock().push((signal.to_string(), payload.clone()));
    });
    registry.register_callback(SIGNAL_PLUGIN_PROCESSED, &listener);
    registry.register_callback(SIGNAL_VALIDATED, &listener);

    let plugins = vec![
        recording("ValidateA", Category::Validator, 1.0, false, &log),
        recording("ValidateB", Category::Validator, 1.1, true, &log),
    ];
    validate(&registry, &Context::new(), Some(plugins)).unwrap();

    let seen = seen.lock();
    let signals: Vec<&str> = seen.iter().map(|(signal, _)| signal.as_str()).collect();
    assert_eq!(signals, vec!["plugin_processed", "plugin_processed", "validated"]);
    assert_eq!(seen[1].1["plugin"]["name"], "ValidateB");
    assert_eq!(seen[1].1["success"], false);
    assert_eq!(seen[2].1["failed"], 1);
}

#[test]
fn test_dropped_listener_is_skipped() {
    let log = call_log();
    let registry = Registry::new();
    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);
    let listener: Callback = Arc::new(move |_: &str, _: &Value| *counter.lock() += 1);
    registry.register_callback(SIGNAL_VALIDATED, &listener);

    validate(&registry, &Context::new(), Some(vec![])).unwrap();
    assert_eq!(*calls.lock(), 1);

    drop(listener);
    validate(
        &registry,
        &Context::new(),
        Some(vec![recording("ValidateA", Category::Validator, 1.0, false, &log)]),
    )
    .unwrap();
    assert_eq!(*calls.lock(), 1);
    assert!(registry.registered_callbacks().is_empty());
}
