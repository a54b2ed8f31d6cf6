//! Configuration loading and output root resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "IMETA_CONFIG";

/// Environment variable overriding the output root folder
pub const OUTPUT_ROOT_ENV_VAR: &str = "IMETA_OUTPUT_ROOT";

/// Fallback output root when nothing else is configured
pub const DEFAULT_OUTPUT_ROOT: &str = "./imeta_output";

/// Contents of `imeta.toml`
///
/// Every field is optional so a partial file still loads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Root folder under which processed images are written
    pub output_root: Option<PathBuf>,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Default project context used when the CLI does not supply one
    pub project: Option<ProjectSection>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `[project]` table: defaults for each project context field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    pub organization_name: Option<String>,
    pub project_name: Option<String>,
    pub inspection_station: Option<String>,
    pub camera_name: Option<String>,
}

/// Platform config file location (`<config_dir>/imeta/imeta.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("imeta").join("imeta.toml"))
}

/// Config file resolution:
/// 1. Command-line argument (highest priority)
/// 2. `IMETA_CONFIG` environment variable
/// 3. Platform default, if it exists
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|p| p.exists())
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// This file was named but does not exist; defaults were used
    Missing(PathBuf),
    /// No file named or found; defaults were used
    Defaults,
}

/// Load config, falling back to defaults when the file is absent
///
/// A missing file is not an error; the returned [`ConfigSource::Missing`]
/// lets the caller warn once logging is up. A file that exists but does not
/// parse is an error.
pub fn load_or_default(path: Option<&Path>) -> Result<(TomlConfig, ConfigSource)> {
    match path {
        Some(path) if path.exists() => {
            debug!(path = %path.display(), "Loading config");
            let config = load_toml_config(path)?;
            Ok((config, ConfigSource::File(path.to_path_buf())))
        }
        Some(path) => Ok((TomlConfig::default(), ConfigSource::Missing(path.to_path_buf()))),
        None => Ok((TomlConfig::default(), ConfigSource::Defaults)),
    }
}

/// Output root resolution priority:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. TOML config
/// 4. Compiled default
pub fn resolve_output_root(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.output_root {
        return path.clone();
    }

    PathBuf::from(DEFAULT_OUTPUT_ROOT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            [project]
            organization_name = "Acme"
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.level, "info");
        assert!(config.output_root.is_none());
        let project = config.project.unwrap();
        assert_eq!(project.organization_name.as_deref(), Some("Acme"));
        assert!(project.camera_name.is_none());
    }

    #[test]
    fn test_cli_arg_wins_output_root() {
        let config = TomlConfig {
            output_root: Some(PathBuf::from("/from/toml")),
            ..Default::default()
        };
        let root = resolve_output_root(
            Some(Path::new("/from/cli")),
            "IMETA_TEST_UNSET_VARIABLE",
            &config,
        );
        assert_eq!(root, PathBuf::from("/from/cli"));
    }

    #[test]
    fn test_toml_used_when_no_cli_or_env() {
        let config = TomlConfig {
            output_root: Some(PathBuf::from("/from/toml")),
            ..Default::default()
        };
        let root = resolve_output_root(None, "IMETA_TEST_UNSET_VARIABLE", &config);
        assert_eq!(root, PathBuf::from("/from/toml"));
    }
}
