//! Cooperative engine driven by a host event loop

use crate::integration::test_utils::{call_log, recording};
use parking_lot::Mutex;
use publish_core::callbacks::{Callback, SIGNAL_ENGINE_FINISHED, SIGNAL_ENGINE_RESET};
use publish_core::engine::{Scheduler, Task};
use publish_core::{Category, Defer, Engine, Registry};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

#[test]
fn test_event_loop_drives_engine_to_completion() {
    let log = call_log();
    let queue: Arc<Mutex<VecDeque<Task>>> = Arc::new(Mutex::new(VecDeque::new()));
    let pending = Arc::clone(&queue);
    let scheduler: Scheduler = Arc::new(move |task| pending.lock().push_back(task));

    let registry = Registry::new();
    let signals = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&signals);
    let listener: Callback = Arc::new(move |signal: &str, _: &Value| sink.lock().push(signal.to_string()));
    registry.register_callback(SIGNAL_ENGINE_RESET, &listener);
    registry.register_callback(SIGNAL_ENGINE_FINISHED, &listener);

    let engine = Engine::new(registry).with_defer(Defer::Scheduled(scheduler));
    engine.reset_with(vec![
        recording("Collect", Category::Collector, 0.0, false, &log),
        recording("Validate", Category::Validator, 1.0, false, &log),
        recording("Extract", Category::Extractor, 2.0, false, &log),
    ]);
    engine.publish();
    assert!(engine.is_running());

    let mut ticks = 0;
    loop {
        let next = queue.lock().pop_front();
        match next {
            Some(task) => {
                task();
                ticks += 1;
            }
            None => break,
        }
    }

    assert_eq!(ticks, 4);
    assert!(!engine.is_running());
    assert_eq!(*log.lock(), vec!["Collect", "Validate", "Extract"]);
    assert_eq!(engine.results().len(), 3);
    assert_eq!(*signals.lock(), vec!["engine_reset", "engine_finished"]);
}

#[test]
fn test_validation_failure_stops_engine_before_extraction() {
    let log = call_log();
    let engine = Engine::new(Registry::new());
    engine.reset_with(vec![
        recording("Validate", Category::Validator, 1.0, true, &log),
        recording("Extract", Category::Extractor, 2.0, false, &log),
    ]);

    engine.validate();
    assert_eq!(engine.results().len(), 1);

    engine.publish();
    assert_eq!(*log.lock(), vec!["Validate"]);
    assert!(engine.step().is_none());
}

#[test]
fn test_reset_starts_a_new_session() {
    let log = call_log();
    let engine = Engine::new(Registry::new());
    engine.reset_with(vec![recording("Collect", Category::Collector, 0.0, false, &log)]);
    engine.publish();
    let first = engine.context();

    engine.reset_with(vec![recording("Collect", Category::Collector, 0.0, false, &log)]);
    assert!(engine.results().is_empty());
    assert!(!first.same_session(&engine.context()));
    engine.publish();
    assert_eq!(log.lock().len(), 2);
}
