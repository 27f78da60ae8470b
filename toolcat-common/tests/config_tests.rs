//! Configuration loading tests
//!
//! Uses serial_test to prevent ENV variable race conditions: every test that
//! touches TOOLCAT_* variables is marked #[serial].

use serial_test::serial;
use std::env;
use std::path::PathBuf;
use toolcat_common::config::{ConfigResolver, RootFolderInitializer, TomlConfig, DEFAULT_PORT};

fn clear_env() {
    for var in [
        "TOOLCAT_CONFIG",
        "TOOLCAT_PORT",
        "TOOLCAT_ROOT_FOLDER",
        "TOOLCAT_ENRICHMENT_URL",
        "TOOLCAT_ENRICHMENT_API_KEY",
    ] {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_missing_explicit_file_falls_back_to_defaults() {
    clear_env();

    let resolver = ConfigResolver::new(Some(PathBuf::from("/nonexistent/toolcat.toml")));
    let config = resolver.load().expect("missing file must not be fatal");

    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.import.source_tag, "batch-import");
}

#[test]
#[serial]
fn test_explicit_file_is_loaded() {
    clear_env();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        port = 7001
        root_folder = "/srv/toolcat"

        [logging]
        level = "debug"

        [import]
        item_delay_ms = 0
        max_batch_size = 50
        "#,
    )
    .unwrap();

    let config = ConfigResolver::new(Some(path)).load().unwrap();

    assert_eq!(config.port, 7001);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.import.item_delay_ms, 0);
    assert_eq!(config.import.max_batch_size, 50);
    assert_eq!(config.resolved_root_folder(), PathBuf::from("/srv/toolcat"));
}

#[test]
#[serial]
fn test_env_var_selects_config_file() {
    clear_env();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("from-env.toml");
    std::fs::write(&path, "port = 7100\n").unwrap();
    env::set_var("TOOLCAT_CONFIG", &path);

    let config = ConfigResolver::new(None).load().unwrap();
    assert_eq!(config.port, 7100);

    clear_env();
}

#[test]
#[serial]
fn test_env_overrides_win_over_file() {
    clear_env();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        port = 7001

        [enrichment]
        endpoint = "http://file.example/enrich"
        "#,
    )
    .unwrap();

    env::set_var("TOOLCAT_PORT", "7200");
    env::set_var("TOOLCAT_ENRICHMENT_URL", "http://env.example/enrich");
    env::set_var("TOOLCAT_ENRICHMENT_API_KEY", "secret");

    let config = ConfigResolver::new(Some(path)).load().unwrap();

    assert_eq!(config.port, 7200);
    assert_eq!(
        config.enrichment.endpoint.as_deref(),
        Some("http://env.example/enrich")
    );
    assert_eq!(config.enrichment.api_key.as_deref(), Some("secret"));

    clear_env();
}

#[test]
#[serial]
fn test_invalid_port_override_is_ignored() {
    clear_env();
    env::set_var("TOOLCAT_PORT", "not-a-port");

    let mut config = TomlConfig::default();
    config.apply_env_overrides();
    assert_eq!(config.port, DEFAULT_PORT);

    clear_env();
}

#[test]
#[serial]
fn test_unparseable_file_is_an_error() {
    clear_env();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "port = [1, 2").unwrap();

    assert!(ConfigResolver::new(Some(path)).load().is_err());
}

#[test]
fn test_root_folder_initializer_creates_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("nested").join("data");

    let init = RootFolderInitializer::new(root.clone());
    init.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert_eq!(init.database_path(), root.join("toolcat.db"));
}
