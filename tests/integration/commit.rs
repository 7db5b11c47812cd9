//! Extractor commit inside a real publish pass

use crate::integration::test_utils::{with_env, write_module};
use publish_core::protocol::commit::{
    commit, commit_configured, CommitSettings, KEY_COMMIT_DIR, KEY_WORKSPACE_DIR,
};
use publish_core::util::publish;
use publish_core::{Category, ConfigLoader, Context, PluginClass, Registry};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_extractor_commits_and_records_destination() {
    let workspace = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    fs::write(staging.path().join("hero.abc"), b"alembic").unwrap();
    fs::create_dir_all(staging.path().join("textures")).unwrap();
    fs::write(staging.path().join("textures").join("diffuse.png"), b"png").unwrap();

    let source = staging.path().to_path_buf();
    let extract = PluginClass::builder("ExtractModel", Category::Extractor)
        .families(["model"])
        .params(["instance"])
        .process_fn(move |args| {
            let instance = args.instance()?;
            commit(&source, instance, &CommitSettings::default())?;
            Ok(())
        });

    let context = Context::new();
    context.set_data(KEY_WORKSPACE_DIR, workspace.path().to_string_lossy().into_owned());
    context.set_data("date", "20260101T000000Z");
    context.set_data("user", "marcus");
    let hero = context.create_instance("hero");
    hero.set_data("family", "model");

    let results = publish(&Registry::new(), &context, Some(vec![extract])).unwrap();
    assert!(results[0].success, "{:?}", results[0].error);

    let expected = workspace
        .path()
        .join("published")
        .join("20260101T000000Z")
        .join("model")
        .join("marcus")
        .join("hero");
    assert_eq!(
        hero.data(KEY_COMMIT_DIR).and_then(|v| v.as_str().map(PathBuf::from)),
        Some(expected.clone())
    );
    assert_eq!(fs::read(expected.join("hero.abc")).unwrap(), b"alembic");
    assert_eq!(fs::read(expected.join("textures").join("diffuse.png")).unwrap(), b"png");
}

#[test]
fn test_missing_workspace_fails_the_extractor() {
    let staging = TempDir::new().unwrap();
    let source = staging.path().to_path_buf();
    let extract = PluginClass::builder("ExtractModel", Category::Extractor)
        .families(["*"])
        .params(["instance"])
        .process_fn(move |args| {
            commit(&source, args.instance()?, &CommitSettings::default())?;
            Ok(())
        });

    let context = Context::new();
    context.create_instance("hero").set_data("family", "model");

    let results = publish(&Registry::new(), &context, Some(vec![extract])).unwrap();
    let error = results[0].error.as_ref().unwrap();
    assert_eq!(error.kind, "missing_data");
    assert!(error.message.contains(KEY_WORKSPACE_DIR));
}

#[test]
fn test_configured_prefix_reaches_the_commit() {
    let temp = TempDir::new().unwrap();
    let config_file = write_module(temp.path(), "pipeline.toml", "[commit]\nprefix = \"releases\"\n");
    let config = with_env(&[], || ConfigLoader::load_from_file(&config_file)).unwrap();
    assert_eq!(config.commit.prefix, "releases");

    let workspace = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    fs::write(staging.path().join("hero.abc"), b"alembic").unwrap();

    let source = staging.path().to_path_buf();
    let extract = PluginClass::builder("ExtractModel", Category::Extractor)
        .families(["model"])
        .params(["instance"])
        .process_fn(move |args| {
            commit_configured(&source, args.instance()?)?;
            Ok(())
        });

    let context = Context::new();
    context.set_data(KEY_WORKSPACE_DIR, workspace.path().to_string_lossy().into_owned());
    context.set_data("date", "20260101T000000Z");
    context.set_data("user", "marcus");
    let hero = context.create_instance("hero");
    hero.set_data("family", "model");

    let results = publish(&Registry::with_config(config), &context, Some(vec![extract])).unwrap();
    assert!(results[0].success, "{:?}", results[0].error);

    let expected = workspace
        .path()
        .join("releases")
        .join("20260101T000000Z")
        .join("model")
        .join("marcus")
        .join("hero");
    assert_eq!(fs::read(expected.join("hero.abc")).unwrap(), b"alembic");
    assert!(!workspace.path().join("published").exists());
}
