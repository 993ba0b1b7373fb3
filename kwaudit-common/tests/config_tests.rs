//! Configuration resolution tests
//!
//! Tests that touch KWAUDIT_* environment variables are marked #[serial] so
//! they never run concurrently.

use kwaudit_common::config::{
    write_toml_config, CompiledDefaults, ConfigOverrides, ConfigResolver, LoggingConfig,
    RootFolderInitializer, TomlConfig, ENV_BACKEND_URL, ENV_CONFIG, ENV_ROOT_FOLDER,
};
use kwaudit_common::Error;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_env() {
    env::remove_var(ENV_CONFIG);
    env::remove_var(ENV_ROOT_FOLDER);
    env::remove_var(ENV_BACKEND_URL);
}

/// Overrides pointing at a config file inside `dir` (which need not exist)
fn overrides_with_file(dir: &TempDir) -> ConfigOverrides {
    ConfigOverrides {
        config_path: Some(dir.path().join("config.toml")),
        ..ConfigOverrides::default()
    }
}

#[test]
fn test_compiled_defaults() {
    let defaults = CompiledDefaults::for_current_platform();
    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert!(defaults.root_folder.to_string_lossy().contains("kwaudit"));
    assert_eq!(defaults.backend_url, "http://localhost:8000");
    assert_eq!(defaults.bind_address, "127.0.0.1");
    assert_eq!(defaults.port, 5740);
    assert_eq!(defaults.request_timeout_secs, 120);
    assert_eq!(defaults.log_level, "info");
    assert!(defaults.log_file.is_none());
}

#[test]
#[serial]
fn test_missing_config_file_uses_defaults() {
    clear_env();
    let dir = TempDir::new().unwrap();

    let config = ConfigResolver::new(overrides_with_file(&dir)).resolve().unwrap();
    let defaults = CompiledDefaults::for_current_platform();

    assert_eq!(config.root_folder, defaults.root_folder);
    assert_eq!(config.backend_url, defaults.backend_url);
    assert_eq!(config.port, defaults.port);
    assert_eq!(config.logging, LoggingConfig::default());
    assert!(config.course_link_template.contains("{code}"));
    assert!(config.program_link_template.contains("{id}"));
}

#[test]
#[serial]
fn test_toml_values_applied() {
    clear_env();
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        r#"
backend_url = "http://analysis.internal:9000/"
port = 6000
request_timeout_secs = 30

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = ConfigResolver::new(overrides_with_file(&dir)).resolve().unwrap();
    assert_eq!(config.backend_url, "http://analysis.internal:9000");
    assert_eq!(config.port, 6000);
    assert_eq!(config.request_timeout_secs, 30);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.bind_address, "127.0.0.1");
}

#[test]
#[serial]
fn test_priority_cli_over_env_over_toml() {
    clear_env();
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "backend_url = \"http://from-toml\"\nroot_folder = \"/tmp/from-toml\"\nport = 6001\n",
    )
    .unwrap();

    env::set_var(ENV_BACKEND_URL, "http://from-env");
    env::set_var(ENV_ROOT_FOLDER, "/tmp/from-env");

    let overrides = ConfigOverrides {
        port: Some(7000),
        root_folder: Some(PathBuf::from("/tmp/from-cli")),
        ..overrides_with_file(&dir)
    };
    let config = ConfigResolver::new(overrides).resolve().unwrap();

    assert_eq!(config.port, 7000);
    assert_eq!(config.root_folder, PathBuf::from("/tmp/from-cli"));
    assert_eq!(config.backend_url, "http://from-env");

    clear_env();
}

#[test]
#[serial]
fn test_config_path_from_env() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "port = 6100\n").unwrap();
    env::set_var(ENV_CONFIG, &path);

    let resolver = ConfigResolver::new(ConfigOverrides::default());
    assert_eq!(resolver.config_file_path(), Some(path));
    assert_eq!(resolver.resolve().unwrap().port, 6100);

    clear_env();
}

#[test]
#[serial]
fn test_invalid_toml_is_error() {
    clear_env();
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.toml"), "port = \"not a number\"\n").unwrap();

    let result = ConfigResolver::new(overrides_with_file(&dir)).resolve();
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_zero_port_rejected() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let overrides = ConfigOverrides {
        port: Some(0),
        ..overrides_with_file(&dir)
    };
    assert!(matches!(
        ConfigResolver::new(overrides).resolve(),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_write_toml_config_round_trip() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("nested").join("config.toml");

    let config = TomlConfig {
        backend_url: Some("http://backend".to_string()),
        port: Some(5999),
        logging: LoggingConfig {
            level: "warn".to_string(),
            file: None,
        },
        ..TomlConfig::default()
    };
    write_toml_config(&config, &target).unwrap();

    assert!(target.exists());
    assert!(!target.with_extension("toml.tmp").exists());
    let loaded: TomlConfig = toml::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_root_folder_initializer() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("data").join("kwaudit");
    let initializer = RootFolderInitializer::new(root.clone());

    assert!(!initializer.database_path().exists());
    initializer.ensure_directory_exists().unwrap();
    initializer.ensure_directory_exists().unwrap();
    assert!(root.is_dir());
    assert_eq!(initializer.database_path(), root.join("kwaudit.db"));
}
