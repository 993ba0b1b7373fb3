//! Configuration loading and resolution
//!
//! Every setting is resolved in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`KWAUDIT_ROOT_FOLDER`, `KWAUDIT_BACKEND_URL`)
//! 3. TOML config file (`--config`, `KWAUDIT_CONFIG`, or the platform default)
//! 4. Compiled default
//!
//! A missing config file is not an error: defaults apply and a warning is
//! logged. A config file that exists but does not parse is.

use crate::export::{DEFAULT_COURSE_LINK_TEMPLATE, DEFAULT_PROGRAM_LINK_TEMPLATE};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const ENV_CONFIG: &str = "KWAUDIT_CONFIG";
pub const ENV_ROOT_FOLDER: &str = "KWAUDIT_ROOT_FOLDER";
pub const ENV_BACKEND_URL: &str = "KWAUDIT_BACKEND_URL";

const APP_DIR: &str = "kwaudit";
const DATABASE_FILE: &str = "kwaudit.db";

/// Built-in values used when nothing else provides a setting
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub backend_url: String,
    pub bind_address: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            backend_url: "http://localhost:8000".to_string(),
            bind_address: "127.0.0.1".to_string(),
            port: 5740,
            request_timeout_secs: 120,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

/// OS-dependent data directory for the database
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("/var/lib/kwaudit"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/kwaudit"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\kwaudit"))
    } else {
        PathBuf::from("./kwaudit_data")
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// On-disk TOML bootstrap file; every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_folder: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_link_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_link_template: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub root_folder: Option<PathBuf>,
    pub backend_url: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub root_folder: PathBuf,
    pub backend_url: String,
    pub bind_address: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub course_link_template: String,
    pub program_link_template: String,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        ConfigResolver::merge(
            &ConfigOverrides::default(),
            TomlConfig::default(),
            CompiledDefaults::for_current_platform(),
        )
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolves [`AppConfig`] from overrides, environment, file and defaults
pub struct ConfigResolver {
    overrides: ConfigOverrides,
}

impl ConfigResolver {
    pub fn new(overrides: ConfigOverrides) -> Self {
        Self { overrides }
    }

    /// Config file to read, if any exists
    pub fn config_file_path(&self) -> Option<PathBuf> {
        if let Some(path) = self.overrides.config_path.clone() {
            return Some(path);
        }
        if let Some(path) = env_value(ENV_CONFIG) {
            return Some(PathBuf::from(path));
        }

        let user_config = dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"));
        if let Some(path) = user_config.filter(|p| p.exists()) {
            return Some(path);
        }

        if cfg!(target_os = "linux") {
            let system_config = PathBuf::from("/etc/kwaudit/config.toml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Read the TOML file; missing means defaults
    pub fn load_toml(&self) -> Result<TomlConfig> {
        let Some(path) = self.config_file_path() else {
            debug!("No config file found, using defaults");
            return Ok(TomlConfig::default());
        };

        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(TomlConfig::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config = toml::from_str::<TomlConfig>(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn resolve(&self) -> Result<AppConfig> {
        let file = self.load_toml()?;
        let mut overrides = self.overrides.clone();

        if overrides.root_folder.is_none() {
            overrides.root_folder = env_value(ENV_ROOT_FOLDER).map(PathBuf::from);
        }
        if overrides.backend_url.is_none() {
            overrides.backend_url = env_value(ENV_BACKEND_URL);
        }

        let config = Self::merge(&overrides, file, CompiledDefaults::for_current_platform());
        if config.port == 0 {
            return Err(Error::Config("port must be non-zero".to_string()));
        }
        Ok(config)
    }

    fn merge(overrides: &ConfigOverrides, file: TomlConfig, defaults: CompiledDefaults) -> AppConfig {
        let mut logging = file.logging;
        if logging.file.is_none() {
            logging.file = defaults.log_file;
        }

        AppConfig {
            root_folder: overrides
                .root_folder
                .clone()
                .or(file.root_folder)
                .unwrap_or(defaults.root_folder),
            backend_url: overrides
                .backend_url
                .clone()
                .or(file.backend_url)
                .unwrap_or(defaults.backend_url)
                .trim_end_matches('/')
                .to_string(),
            bind_address: overrides
                .bind_address
                .clone()
                .or(file.bind_address)
                .unwrap_or(defaults.bind_address),
            port: overrides.port.or(file.port).unwrap_or(defaults.port),
            request_timeout_secs: file
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            course_link_template: file
                .course_link_template
                .unwrap_or_else(|| DEFAULT_COURSE_LINK_TEMPLATE.to_string()),
            program_link_template: file
                .program_link_template
                .unwrap_or_else(|| DEFAULT_PROGRAM_LINK_TEMPLATE.to_string()),
            logging,
        }
    }
}

/// Makes sure the data directory exists before the database is opened
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the folder (and parents); safe to call repeatedly
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            info!("Creating root folder {}", self.root_folder.display());
        }
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }
}

/// Write a config file atomically (temp file, then rename)
pub fn write_toml_config(config: &TomlConfig, target: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp = target.with_extension("toml.tmp");
    std::fs::write(&temp, content)?;
    std::fs::rename(&temp, target)?;
    Ok(())
}
