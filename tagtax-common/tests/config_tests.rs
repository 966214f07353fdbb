//! Configuration and root folder resolution tests
//!
//! Tests that manipulate TAGTAX_* environment variables are marked
//! #[serial] so they never run in parallel with each other.

use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tagtax_common::config::{
    write_toml_config, ClassifierConfig, CompiledDefaults, ErrorAction, LoggingConfig,
    RootFolderInitializer, RootFolderResolver, StagePolicyConfig, TomlConfig, ENV_CLASSIFIER_MODEL,
    ENV_ROOT, ENV_ROOT_FOLDER,
};
use tempfile::TempDir;

fn clear_root_env() {
    env::remove_var(ENV_ROOT_FOLDER);
    env::remove_var(ENV_ROOT);
}

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();
    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert!(defaults.root_folder.ends_with("tagtax") || defaults.root_folder.ends_with("tagtax_data"));
    assert_eq!(defaults.log_level, "info");
    assert!(defaults.log_file.is_none());
}

#[test]
#[serial]
fn test_resolver_env_var_root_folder() {
    clear_root_env();
    env::set_var(ENV_ROOT_FOLDER, "/tmp/tagtax-test-env-folder");

    let root_folder = RootFolderResolver::new("tagtax-test").resolve();
    assert_eq!(root_folder, PathBuf::from("/tmp/tagtax-test-env-folder"));

    clear_root_env();
}

#[test]
#[serial]
fn test_resolver_root_folder_takes_precedence_over_root() {
    clear_root_env();
    env::set_var(ENV_ROOT_FOLDER, "/tmp/tagtax-priority-1");
    env::set_var(ENV_ROOT, "/tmp/tagtax-priority-2");

    let root_folder = RootFolderResolver::new("tagtax-test").resolve();
    assert_eq!(root_folder, PathBuf::from("/tmp/tagtax-priority-1"));

    clear_root_env();
}

#[test]
#[serial]
fn test_resolver_cli_beats_environment() {
    clear_root_env();
    env::set_var(ENV_ROOT_FOLDER, "/tmp/tagtax-from-env");

    let root_folder = RootFolderResolver::new("tagtax-test")
        .with_cli_arg(Some(PathBuf::from("/tmp/tagtax-from-cli")))
        .resolve();
    assert_eq!(root_folder, PathBuf::from("/tmp/tagtax-from-cli"));

    clear_root_env();
}

#[test]
#[serial]
fn test_resolver_missing_config_file_falls_back_to_default() {
    clear_root_env();

    let resolver = RootFolderResolver::new("nonexistent-tagtax-module-12345");
    let root_folder = resolver.resolve();

    assert_eq!(root_folder, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
#[serial]
fn test_resolver_explicit_config_file_supplies_root() {
    clear_root_env();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("custom.toml");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/srv/from-toml")),
        ..TomlConfig::default()
    };
    write_toml_config(&config, &path).unwrap();

    let root_folder = RootFolderResolver::new("tagtax-test")
        .with_config_file(Some(path))
        .resolve();
    assert_eq!(root_folder, PathBuf::from("/srv/from-toml"));
}

#[test]
fn test_initializer_creates_nested_directory_idempotently() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("level1").join("level2");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_directory_exists().unwrap();
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
}

#[test]
fn test_initializer_ledger_paths_follow_collector_config() {
    let temp = TempDir::new().unwrap();
    let initializer = RootFolderInitializer::new(temp.path().to_path_buf());

    let mut collector = TomlConfig::default().collector;
    collector.entities_dir = PathBuf::from("tracks");

    let paths = initializer.ledger_paths(&collector);
    assert_eq!(paths.entities_dir(), temp.path().join("tracks"));
    assert_eq!(paths.raw_tags(), temp.path().join("raw_tags.jsonl"));
}

#[test]
fn test_toml_write_and_reload() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("conf").join("tagtax-pipeline.toml");

    let mut policy = std::collections::BTreeMap::new();
    policy.insert(
        "canonicalize".to_string(),
        StagePolicyConfig {
            on_parse_error: Some(ErrorAction::Abort),
            on_service_error: None,
        },
    );
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/music-data")),
        logging: LoggingConfig {
            level: "debug".to_string(),
            log_file: None,
        },
        classifier: ClassifierConfig {
            model: "mistral:7b".to_string(),
            ..ClassifierConfig::default()
        },
        collector: Default::default(),
        policy,
    };

    write_toml_config(&config, &target).unwrap();
    assert!(target.exists());
    assert!(!temp.path().join("conf").join("tagtax-pipeline.toml.tmp").exists());

    let reloaded = TomlConfig::load_from(&target).unwrap();
    assert_eq!(reloaded, config);
}

#[test]
fn test_malformed_toml_is_an_error_for_explicit_load() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("broken.toml");
    std::fs::write(&target, "root_folder = [not valid").unwrap();

    assert!(TomlConfig::load_from(&target).is_err());
}

#[test]
#[serial]
fn test_classifier_env_override() {
    env::set_var(ENV_CLASSIFIER_MODEL, "gemma2:9b");

    let mut classifier = ClassifierConfig::default();
    classifier.apply_env_overrides();
    assert_eq!(classifier.model, "gemma2:9b");
    assert_eq!(classifier.endpoint, ClassifierConfig::default().endpoint);

    env::remove_var(ENV_CLASSIFIER_MODEL);
}
