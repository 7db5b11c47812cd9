//! End-to-end publishing through the util wrappers

use crate::integration::test_utils::{call_log, recording};
use parking_lot::Mutex;
use publish_core::util::{publish, publish_checked};
use publish_core::{Category, Context, PluginClass, PluginError, PublishError, Registry};
use serde_json::json;
use std::sync::Arc;

fn select_scene() -> PluginClass {
    PluginClass::builder("SelectScene", Category::Collector)
        .hosts(["*"])
        .params(["context"])
        .process_fn(|args| {
            let context = args.context()?;
            for (name, family) in [
                ("hero_model", "model"),
                ("hero_rig", "rig"),
                ("prop_rig", "rig"),
                ("turntable", "review"),
            ] {
                let instance = context.create_instance(name);
                instance.set_data("family", family);
            }
            Ok(())
        })
}

#[test]
fn test_select_then_validate_per_instance() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let validate = PluginClass::builder("ValidateNaming", Category::Validator)
        .families(["model", "rig"])
        .params(["instance"])
        .process_fn(move |args| {
            let instance = args.instance()?;
            sink.lock().push(instance.name());
            if instance.name() == "hero_rig" {
                return Err(PluginError::failed("rig is not named by convention"));
            }
            Ok(())
        });

    let context = Context::new();
    let results = publish(&Registry::new(), &context, Some(vec![validate, select_scene()])).unwrap();

    assert_eq!(*seen.lock(), vec!["hero_model", "hero_rig", "prop_rig"]);
    assert_eq!(results.len(), 4);
    assert_eq!(results[0].plugin.name, "SelectScene");
    assert_eq!(results[0].instance, None);
    assert_eq!(results[1].instance.as_deref(), Some("hero_model"));
    assert!(results[1].success);
    assert_eq!(results[2].instance.as_deref(), Some("hero_rig"));
    let error = results[2].error.as_ref().unwrap();
    assert_eq!(error.instance.as_deref(), Some("hero_rig"));
    assert!(error.traceback.contains("rig is not named by convention"));
    assert_eq!(results[3].instance.as_deref(), Some("prop_rig"));
    assert!(results[3].success);

    let log = context.data("results").unwrap();
    assert_eq!(log.as_array().unwrap().len(), 4);
    assert_eq!(log[2]["success"], json!(false));
}

#[test]
fn test_failed_validation_blocks_extraction_and_integration() {
    let log = call_log();
    let plugins = vec![
        recording("Collect", Category::Collector, 0.0, false, &log),
        recording("ValidateA", Category::Validator, 1.0, true, &log),
        recording("ValidateB", Category::Validator, 1.2, false, &log),
        recording("Extract", Category::Extractor, 2.0, false, &log),
        recording("Integrate", Category::Integrator, 3.0, false, &log),
    ];

    let results = publish(&Registry::new(), &Context::new(), Some(plugins)).unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(*log.lock(), vec!["Collect", "ValidateA", "ValidateB"]);
}

#[test]
fn test_failed_extraction_does_not_block_integration() {
    let log = call_log();
    let plugins = vec![
        recording("Extract", Category::Extractor, 2.0, true, &log),
        recording("Integrate", Category::Integrator, 3.0, false, &log),
    ];

    let results = publish(&Registry::new(), &Context::new(), Some(plugins)).unwrap();
    assert_eq!(results.len(), 2);
    assert!(!results[0].success);
    assert!(results[1].success);
}

#[test]
fn test_wildcard_plugin_runs_once_on_empty_context() {
    let runs = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&runs);
    let wildcard = PluginClass::builder("ValidateAnything", Category::Validator)
        .families(["*"])
        .params(["instance"])
        .process_fn(move |args| {
            sink.lock().push(args.instance_opt().map(|i| i.name()));
            Ok(())
        });
    let specific = PluginClass::builder("ValidateModels", Category::Validator)
        .families(["model"])
        .params(["instance"])
        .process_fn(|_| Ok(()));

    let results = publish(&Registry::new(), &Context::new(), Some(vec![wildcard, specific])).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(*runs.lock(), vec![None]);
}

#[test]
fn test_instances_opted_out_are_skipped() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let validate = PluginClass::builder("ValidateAll", Category::Validator)
        .families(["*"])
        .params(["instance"])
        .process_fn(move |args| {
            sink.lock().push(args.instance()?.name());
            Ok(())
        });

    let context = Context::new();
    context.create_instance("kept").set_data("family", "model");
    context.create_instance("skipped").set_data("publish", false);

    publish(&Registry::new(), &context, Some(vec![validate])).unwrap();
    assert_eq!(*seen.lock(), vec!["kept"]);
}

#[test]
fn test_targets_filter_plugins() {
    let log = call_log();
    let farm = PluginClass::builder("ExtractOnFarm", Category::Extractor)
        .families(["*"])
        .targets(["farm"])
        .process_fn({
            let log = Arc::clone(&log);
            move |_| {
                log.lock().push("ExtractOnFarm".to_string());
                Ok(())
            }
        });
    let local = recording("ExtractLocal", Category::Extractor, 2.0, false, &log);

    let mut registry = Registry::new();
    publish(&registry, &Context::new(), Some(vec![farm.clone(), local.clone()])).unwrap();
    assert_eq!(*log.lock(), vec!["ExtractLocal"]);

    log.lock().clear();
    registry.deregister_all_targets();
    registry.register_target("farm");
    publish(&registry, &Context::new(), Some(vec![farm, local])).unwrap();
    assert_eq!(*log.lock(), vec!["ExtractOnFarm"]);
}

#[test]
fn test_unresolved_service_is_a_failed_result() {
    let needs_service = PluginClass::builder("ValidateBudget", Category::Validator)
        .families(["*"])
        .params(["budget"])
        .process_fn(|args| {
            let budget: u64 = args.get_as("budget")?;
            if budget < 10 {
                return Err(PluginError::failed("over budget"));
            }
            Ok(())
        });

    let results = publish(&Registry::new(), &Context::new(), Some(vec![needs_service.clone()])).unwrap();
    assert_eq!(results[0].error.as_ref().unwrap().kind, "unresolved");

    let mut registry = Registry::new();
    registry.register_service("budget", 25);
    let results = publish(&registry, &Context::new(), Some(vec![needs_service])).unwrap();
    assert!(results[0].success);
}

#[test]
fn test_publish_checked_surfaces_the_error() {
    let log = call_log();
    let plugins = vec![recording("ValidateA", Category::Validator, 1.0, true, &log)];
    match publish_checked(&Registry::new(), &Context::new(), Some(plugins)) {
        Err(PublishError::Process(error)) => assert_eq!(error.plugin, "ValidateA"),
        other => panic!("expected a process error, got {:?}", other.map(|r| r.len())),
    }
}
