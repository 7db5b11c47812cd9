//! Configuration driving discovery and iteration

use crate::integration::test_utils::{noop_factory, with_env, write_module};
use parking_lot::Mutex;
use publish_core::util::publish;
use publish_core::{Category, ConfigLoader, Context, PluginClass, Registry};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_configured_patterns_and_paths_drive_discovery() {
    let temp = TempDir::new().unwrap();
    let plugins = temp.path().join("plugins");
    fs::create_dir_all(&plugins).unwrap();
    write_module(
        &plugins,
        "check_topology.toml",
        "[[plugin]]\nname = \"CheckTopology\"\nfactory = \"noop\"\nfamilies = [\"model\"]\n",
    );
    write_module(
        &plugins,
        "validate_names.toml",
        "[[plugin]]\nname = \"ValidateNames\"\nfactory = \"noop\"\nfamilies = [\"model\"]\n",
    );

    let config_file = write_module(
        temp.path(),
        "pipeline.toml",
        "[discovery.patterns]\nvalidators = \"^check_\"\n",
    );
    let paths = plugins.to_string_lossy().into_owned();

    let config = with_env(&[("PUBLISH__DISCOVERY__PATHS", Some(paths.as_str()))], || {
        ConfigLoader::load_from_file(&config_file)
    })
    .unwrap();
    assert_eq!(config.discovery.paths, vec![plugins.clone()]);

    let mut registry = Registry::with_config(config);
    registry.register_factory("noop", noop_factory());
    let found = registry.discover(Some("validators"), None, None).unwrap();
    let names: Vec<&str> = found.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["CheckTopology"]);
    assert_eq!(found[0].category(), Category::Validator);
}

#[test]
fn test_publish_by_default_off_requires_opt_in() {
    let temp = TempDir::new().unwrap();
    let config_file = write_module(temp.path(), "pipeline.toml", "publish_by_default = false\n");
    let config = with_env(&[], || ConfigLoader::load_from_file(&config_file)).unwrap();
    assert!(!config.publish_by_default);

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
    context.create_instance("implicit");
    context.create_instance("explicit").set_data("publish", true);

    publish(&Registry::with_config(config), &context, Some(vec![validate])).unwrap();
    assert_eq!(*seen.lock(), vec!["explicit"]);
}

#[test]
fn test_invalid_pattern_is_rejected_at_load() {
    let temp = TempDir::new().unwrap();
    let config_file = write_module(
        temp.path(),
        "pipeline.toml",
        "[discovery.patterns]\nextractors = \"(\"\n",
    );
    let result = with_env(&[], || ConfigLoader::load_from_file(&config_file));
    assert!(result.is_err());
}
