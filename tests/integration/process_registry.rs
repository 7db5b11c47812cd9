//! The process-wide registry façade

use crate::integration::test_utils::{call_log, global_lock, recording};
use publish_core::{api, Category, Context, RegistryError};
use tempfile::TempDir;

#[test]
fn test_registrations_are_shared_until_reset() {
    let _guard = global_lock();
    api::reset();

    let temp = TempDir::new().unwrap();
    let log = call_log();
    api::register_plugin_path(temp.path()).unwrap();
    api::register_plugin(recording("CollectScene", Category::Collector, 0.0, false, &log)).unwrap();
    api::register_service("project", "hero_film");

    assert_eq!(api::registered_paths().len(), 1);
    assert!(api::with_registry(|registry| registry.provider().contains("project")));

    let discovered = api::discover(None, None).unwrap();
    assert_eq!(discovered.len(), 1);

    let results = api::publish(None, None).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(Context::shared().data("results").unwrap().as_array().unwrap().len(), 1);

    api::reset();
    assert!(api::registered_paths().is_empty());
    assert!(api::registered_plugins().is_empty());
    assert!(Context::shared().data("results").is_none());
}

#[test]
fn test_misuse_is_reported() {
    let _guard = global_lock();
    api::reset();
    let temp = TempDir::new().unwrap();

    assert!(matches!(
        api::deregister_plugin_path(temp.path()),
        Err(RegistryError::PathNotRegistered(_))
    ));
    assert!(matches!(
        api::discover(Some("exporters"), None),
        Err(RegistryError::UnknownCategory(_))
    ));
    assert!(matches!(
        api::deregister_service("missing"),
        Err(RegistryError::NotRegistered { kind: "Service", .. })
    ));
    api::reset();
}
