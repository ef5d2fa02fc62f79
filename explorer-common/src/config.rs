//! Bootstrap configuration loading and database path resolution
//!
//! Configuration is minimal and static: database location, listen address,
//! logging, token lifetimes and import policy. Everything is read once at
//! startup; a restart is required to pick up changes.
//!
//! # Sources Priority
//!
//! 1. Command-line arguments (`--config`, `--database`, `--port`)
//! 2. Environment variables (`EXPLORER_CONFIG`, `EXPLORER_DATABASE`)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use crate::{Error, ReferenceKind, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "EXPLORER_CONFIG";

/// Environment variable naming the SQLite database file
pub const DATABASE_ENV_VAR: &str = "EXPLORER_DATABASE";

/// Bootstrap configuration loaded from TOML file
///
/// Every field has a built-in default, so an empty (or absent) file yields a
/// working configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Path to SQLite database file (optional, see [`resolve_database_path`])
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Token lifetimes (optional)
    #[serde(default)]
    pub auth: AuthConfig,

    /// CSV import policy (optional)
    #[serde(default)]
    pub import: ImportConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Bearer token lifetimes
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: u64,

    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: u64,
}

/// CSV import policy
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Reference attributes whose missing values are created automatically.
    ///
    /// Empty by default: every missing reference value must be created by an
    /// operator before the upload is retried.
    #[serde(default)]
    pub auto_create: Vec<ReferenceKind>,

    /// Upper bound on the uploaded file size
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5800
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_access_ttl() -> u64 {
    15 * 60
}

fn default_refresh_ttl() -> u64 {
    24 * 60 * 60
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            bind_address: default_bind_address(),
            port: default_port(),
            logging: LoggingConfig::default(),
            auth: AuthConfig::default(),
            import: ImportConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_ttl_secs: default_access_ttl(),
            refresh_token_ttl_secs: default_refresh_ttl(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            auto_create: Vec::new(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration following the priority order.
    ///
    /// A missing file is not fatal: defaults are used and the returned
    /// [`ConfigSource`] says so. A file that exists but does not parse is an
    /// error. Nothing is logged here because this runs before the tracing
    /// subscriber exists; call [`ConfigSource::log`] once it does.
    pub fn load(cli_arg: Option<&Path>) -> Result<(Self, ConfigSource)> {
        match resolve_config_path(cli_arg) {
            Some(path) if path.exists() => {
                let config = Self::from_file(&path)?;
                Ok((config, ConfigSource::File(path)))
            }
            Some(path) => Ok((Self::default(), ConfigSource::Missing(path))),
            None => Ok((Self::default(), ConfigSource::Defaults)),
        }
    }
}

/// Where [`TomlConfig::load`] got its values from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// This file was named but does not exist
    Missing(PathBuf),
    /// No file named anywhere
    Defaults,
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Configuration: {}", path.display()),
            ConfigSource::Missing(path) => warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            ),
            ConfigSource::Defaults => warn!("No config file found, using built-in defaults"),
        }
    }
}

/// Locate the TOML config file.
///
/// CLI argument, then environment variable, then the per-user config
/// directory (only if the file exists there).
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir()
        .map(|d| d.join("explorer").join("config.toml"))
        .filter(|p| p.exists())
}

/// Resolve the database file path.
///
/// CLI argument, then environment variable, then TOML, then the
/// OS-dependent default.
pub fn resolve_database_path(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
        return PathBuf::from(path);
    }

    if let Some(path) = &config.database_path {
        return path.clone();
    }

    default_database_path()
}

/// Get OS-dependent default database path
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("explorer").join("explorer.db"))
        .unwrap_or_else(|| PathBuf::from("./explorer_data/explorer.db"))
}
