//! Context-wide legacy plug-ins alongside current ones

use parking_lot::Mutex;
use publish_core::util::publish;
use publish_core::{Category, Context, Instance, LegacyPlugin, PluginClass, PluginError, Registry};
use std::sync::Arc;

struct CheckFrameRange {
    visited: Arc<Mutex<Vec<String>>>,
}

impl LegacyPlugin for CheckFrameRange {
    fn process_context(&mut self, context: &Context) -> Result<(), PluginError> {
        if context.data("fps").is_none() {
            return Err(PluginError::missing_data("fps"));
        }
        self.visited.lock().push("context".to_string());
        Ok(())
    }

    fn process_instance(&mut self, instance: &Instance) -> Result<(), PluginError> {
        self.visited.lock().push(instance.name());
        match instance.data("frame_start") {
            Some(_) => Ok(()),
            None => Err(PluginError::missing_data("frame_start")),
        }
    }
}

fn legacy_class(visited: &Arc<Mutex<Vec<String>>>) -> PluginClass {
    let visited = Arc::clone(visited);
    PluginClass::builder("CheckFrameRange", Category::Validator)
        .families(["animation"])
        .legacy(move || CheckFrameRange {
            visited: Arc::clone(&visited),
        })
}

fn context_with_shots() -> Context {
    let context = Context::new();
    let shot_a = context.create_instance("shot_a");
    shot_a.set_data("family", "animation");
    shot_a.set_data("frame_start", 1001);
    context.create_instance("shot_b").set_data("family", "animation");
    context.create_instance("hero_model").set_data("family", "model");
    context
}

#[test]
fn test_legacy_plugin_reports_context_and_each_instance() {
    let visited = Arc::new(Mutex::new(Vec::new()));
    let context = context_with_shots();
    context.set_data("fps", 24);

    let results = publish(&Registry::new(), &context, Some(vec![legacy_class(&visited)])).unwrap();

    assert_eq!(*visited.lock(), vec!["context", "shot_a", "shot_b"]);
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].instance, None);
    assert!(results[0].success);
    assert!(results[1].success);
    assert_eq!(results[2].instance.as_deref(), Some("shot_b"));
    assert_eq!(results[2].error.as_ref().unwrap().kind, "missing_data");
}

#[test]
fn test_legacy_context_failure_skips_instances() {
    let visited = Arc::new(Mutex::new(Vec::new()));
    let context = context_with_shots();

    let results = publish(&Registry::new(), &context, Some(vec![legacy_class(&visited)])).unwrap();

    assert!(visited.lock().is_empty());
    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
}

#[test]
fn test_log_records_are_attached_to_their_result() {
    let chatty = PluginClass::builder("CollectChatty", Category::Collector)
        .hosts(["*"])
        .process_fn(|_| {
            tracing::info!(shots = 2, "Collected shots");
            Ok(())
        });
    let quiet = PluginClass::builder("CollectQuiet", Category::Collector)
        .hosts(["*"])
        .order(0.1)
        .process_fn(|_| Ok(()));

    let results = publish(&Registry::new(), &Context::new(), Some(vec![chatty, quiet])).unwrap();
    assert_eq!(results[0].records.len(), 1);
    assert_eq!(results[0].records[0].message, "Collected shots");
    assert_eq!(results[0].records[0].fields.get("shots").map(String::as_str), Some("2"));
    assert!(results[1].records.is_empty());
}
