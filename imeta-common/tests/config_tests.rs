//! Configuration loading and source-priority tests
//!
//! Uses serial_test: tests touching IMETA_* environment variables are
//! marked #[serial] so they never race each other.

use imeta_common::config::{
    load_or_default, load_toml_config, resolve_config_path, resolve_output_root, ConfigSource,
    TomlConfig, CONFIG_ENV_VAR, DEFAULT_OUTPUT_ROOT, OUTPUT_ROOT_ENV_VAR,
};
use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_load_full_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("imeta.toml");
    fs::write(
        &path,
        r#"
output_root = "/data/inspections"

[logging]
level = "debug"

[project]
organization_name = "Acme"
project_name = "Line 4"
inspection_station = "S1"
camera_name = "Basler"
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.output_root, Some(PathBuf::from("/data/inspections")));
    assert_eq!(config.logging.level, "debug");
    let project = config.project.unwrap();
    assert_eq!(project.project_name.as_deref(), Some("Line 4"));
    assert_eq!(project.camera_name.as_deref(), Some("Basler"));
}

#[test]
fn test_missing_file_degrades_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");

    let (config, source) = load_or_default(Some(&path)).unwrap();
    assert_eq!(config, TomlConfig::default());
    assert_eq!(source, ConfigSource::Missing(path));
}

#[test]
fn test_load_reports_source() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("imeta.toml");
    fs::write(&path, "[logging]\nlevel = \"warn\"\n").unwrap();

    let (config, source) = load_or_default(Some(&path)).unwrap();
    assert_eq!(config.logging.level, "warn");
    assert_eq!(source, ConfigSource::File(path));

    let (config, source) = load_or_default(None).unwrap();
    assert_eq!(config, TomlConfig::default());
    assert_eq!(source, ConfigSource::Defaults);
}

#[test]
fn test_unparseable_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    fs::write(&path, "output_root = [unterminated").unwrap();

    let err = load_or_default(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("Configuration error"));
}

#[test]
#[serial]
fn test_env_var_overrides_toml_output_root() {
    env::set_var(OUTPUT_ROOT_ENV_VAR, "/from/env");
    let config = TomlConfig {
        output_root: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    let root = resolve_output_root(None, OUTPUT_ROOT_ENV_VAR, &config);
    env::remove_var(OUTPUT_ROOT_ENV_VAR);

    assert_eq!(root, PathBuf::from("/from/env"));
}

#[test]
#[serial]
fn test_compiled_default_output_root() {
    env::remove_var(OUTPUT_ROOT_ENV_VAR);
    let root = resolve_output_root(None, OUTPUT_ROOT_ENV_VAR, &TomlConfig::default());
    assert_eq!(root, PathBuf::from(DEFAULT_OUTPUT_ROOT));
}

#[test]
#[serial]
fn test_config_path_from_env() {
    env::set_var(CONFIG_ENV_VAR, "/etc/imeta/custom.toml");
    let path = resolve_config_path(None);
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(path, Some(PathBuf::from("/etc/imeta/custom.toml")));
}

#[test]
#[serial]
fn test_config_path_cli_beats_env() {
    env::set_var(CONFIG_ENV_VAR, "/etc/imeta/custom.toml");
    let path = resolve_config_path(Some(PathBuf::from("/tmp/cli.toml").as_path()));
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(path, Some(PathBuf::from("/tmp/cli.toml")));
}
