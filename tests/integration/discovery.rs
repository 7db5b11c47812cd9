//! Discovery across registered, environment and configured plug-in paths

use crate::integration::test_utils::{noop_factory, with_env, write_module};
use publish_core::config::PipelineConfig;
use publish_core::{Category, Registry, RegistryError};
use tempfile::TempDir;

fn manifest(name: &str, extra: &str) -> String {
    format!(
        "[[plugin]]\nname = \"{}\"\nfactory = \"noop\"\nhosts = [\"*\"]\nfamilies = [\"*\"]\n{}",
        name, extra
    )
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.register_factory("noop", noop_factory());
    registry
}

#[test]
fn test_paths_are_searched_registered_then_env_then_config() {
    let registered = TempDir::new().unwrap();
    let from_env = TempDir::new().unwrap();
    let configured = TempDir::new().unwrap();

    write_module(registered.path(), "collect_scene.toml", &manifest("CollectScene", "label = \"registered\"\n"));
    write_module(from_env.path(), "collect_scene.toml", &manifest("CollectScene", "label = \"env\"\n"));
    write_module(from_env.path(), "validate_mesh.toml", &manifest("ValidateMesh", ""));
    write_module(configured.path(), "extract_alembic.toml", &manifest("ExtractAlembic", ""));
    write_module(configured.path(), "validate_mesh.toml", &manifest("ValidateMesh", "label = \"configured\"\n"));

    let env_value = from_env.path().to_string_lossy().into_owned();
    with_env(&[("PUBLISH_PLUGIN_PATH", Some(env_value.as_str()))], || {
        let mut config = PipelineConfig::default();
        config.discovery.paths.push(configured.path().to_path_buf());
        let mut registry = registry();
        registry.set_config(config);
        registry.register_plugin_path(registered.path()).unwrap();

        assert_eq!(registry.plugin_paths().len(), 3);

        let plugins = registry.discover(None, None, None).unwrap();
        let names: Vec<(&str, &str)> = plugins.iter().map(|p| (p.name(), p.label())).collect();
        assert_eq!(
            names,
            vec![
                ("CollectScene", "registered"),
                ("ValidateMesh", "ValidateMesh"),
                ("ExtractAlembic", "ExtractAlembic"),
            ]
        );
    });
}

#[test]
fn test_category_comes_from_module_pattern() {
    let dir = TempDir::new().unwrap();
    write_module(dir.path(), "select_cameras.toml", &manifest("SelectCameras", ""));
    write_module(dir.path(), "conform_shots.toml", &manifest("ConformShots", ""));
    write_module(dir.path(), "readme.toml", &manifest("Ignored", ""));

    let registry = registry();
    let paths = [dir.path().to_path_buf()];
    let plugins = registry.discover(None, None, Some(&paths[..])).unwrap();
    let found: Vec<(&str, Category)> = plugins.iter().map(|p| (p.name(), p.category())).collect();
    assert_eq!(
        found,
        vec![
            ("ConformShots", Category::Integrator),
            ("SelectCameras", Category::Collector),
        ]
    );

    let integrators = registry.discover(Some("conform"), None, Some(&paths[..])).unwrap();
    assert_eq!(integrators.len(), 1);
    assert_eq!(integrators[0].name(), "ConformShots");
}

#[test]
fn test_incompatible_and_invalid_plugins_are_excluded() {
    let dir = TempDir::new().unwrap();
    write_module(
        dir.path(),
        "validate_future.toml",
        &manifest("ValidateFuture", "requires = \">=99\"\n"),
    );
    write_module(
        dir.path(),
        "collect_houdini.toml",
        "[[plugin]]\nname = \"CollectHoudini\"\nfactory = \"noop\"\nhosts = [\"houdini\"]\n",
    );
    write_module(
        dir.path(),
        "integrate_bare.toml",
        "[[plugin]]\nname = \"IntegrateBare\"\nfactory = \"noop\"\n",
    );
    write_module(dir.path(), "validate_broken.toml", "[[plugin]]\nname = ");
    write_module(dir.path(), "validate_mesh.toml", &manifest("ValidateMesh", ""));

    let mut registry = registry();
    registry.register_host("maya");
    let plugins = registry
        .discover(None, None, Some(&[dir.path().to_path_buf()][..]))
        .unwrap();
    let names: Vec<&str> = plugins.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["ValidateMesh"]);
}

#[test]
fn test_plugins_from_module() {
    let dir = TempDir::new().unwrap();
    let module = write_module(
        dir.path(),
        "extract_model.toml",
        &format!("{}\n{}", manifest("ExtractModel", ""), manifest("ExtractRig", "order = 2.2\n")),
    );

    let registry = registry();
    let plugins = registry.plugins_from_module(&module).unwrap();
    assert_eq!(plugins.len(), 2);
    assert!(plugins.iter().all(|p| p.category() == Category::Extractor));
    assert_eq!(plugins[1].order(), Some(2.2));

    let missing_factory = write_module(
        dir.path(),
        "extract_cache.toml",
        "[[plugin]]\nname = \"ExtractCache\"\nfactory = \"nope\"\nfamilies = [\"*\"]\n",
    );
    assert!(matches!(
        registry.plugins_from_module(&missing_factory),
        Err(RegistryError::Module { .. })
    ));
}

#[test]
fn test_invalid_regex_is_reported() {
    let registry = registry();
    let paths: Vec<std::path::PathBuf> = Vec::new();
    assert!(matches!(
        registry.discover(None, Some("(unclosed"), Some(&paths[..])),
        Err(RegistryError::InvalidPattern { .. })
    ));
}
