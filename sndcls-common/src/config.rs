//! Bootstrap configuration loading and resolution
//!
//! Each setting is resolved in priority order:
//! 1. Command-line argument or environment variable (handled by the binary's clap parser)
//! 2. TOML config file
//! 3. Compiled default
//!
//! A missing TOML file is not an error: the service logs a warning and
//! starts with compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit TOML config file
pub const CONFIG_ENV_VAR: &str = "SNDCLS_CONFIG";

/// Bootstrap configuration read from TOML
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TomlConfig {
    /// Interface to bind
    #[serde(default)]
    pub host: Option<String>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Feature extraction JSON document
    #[serde(default)]
    pub extraction_config: Option<PathBuf>,

    /// Class registry JSON document
    #[serde(default)]
    pub classes: Option<PathBuf>,

    /// Classifier weights (safetensors)
    #[serde(default)]
    pub model: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values used when neither the command line nor the TOML file sets a field
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub host: String,
    pub port: u16,
    pub extraction_config: PathBuf,
    pub classes: PathBuf,
    pub model: PathBuf,
    pub log_level: String,
}

impl Default for CompiledDefaults {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            extraction_config: PathBuf::from("config/feature_extraction.json"),
            classes: PathBuf::from("config/classes.json"),
            model: PathBuf::from("models/best_model.safetensors"),
            log_level: default_log_level(),
        }
    }
}

/// Settings supplied on the command line (or through their env fallbacks)
#[derive(Debug, Clone, Default)]
pub struct ServiceOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub extraction_config: Option<PathBuf>,
    pub classes: Option<PathBuf>,
    pub model: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub extraction_config: PathBuf,
    pub classes: PathBuf,
    pub model: PathBuf,
    pub log_level: String,
}

impl ServiceConfig {
    /// Merge overrides, TOML values and compiled defaults field by field
    pub fn resolve(overrides: ServiceOverrides, toml: &TomlConfig) -> Self {
        let defaults = CompiledDefaults::default();
        Self {
            host: overrides
                .host
                .or_else(|| toml.host.clone())
                .unwrap_or(defaults.host),
            port: overrides.port.or(toml.port).unwrap_or(defaults.port),
            extraction_config: overrides
                .extraction_config
                .or_else(|| toml.extraction_config.clone())
                .unwrap_or(defaults.extraction_config),
            classes: overrides
                .classes
                .or_else(|| toml.classes.clone())
                .unwrap_or(defaults.classes),
            model: overrides
                .model
                .or_else(|| toml.model.clone())
                .unwrap_or(defaults.model),
            log_level: overrides
                .log_level
                .unwrap_or_else(|| toml.logging.level.clone()),
        }
    }

    /// Socket address string for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Platform config file location: `<config_dir>/sndcls/sndcls.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sndcls").join("sndcls.toml"))
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Locate and load the TOML config, falling back to defaults when absent
///
/// Lookup order: explicit path, `SNDCLS_CONFIG`, platform default path.
/// A file that exists but does not parse is an error; a missing file is not.
pub fn load_toml_or_default(explicit: Option<&Path>) -> Result<TomlConfig> {
    let candidate = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
        .or_else(default_config_path);

    match candidate {
        Some(path) if path.exists() => {
            let config = load_toml_config(&path)?;
            info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        Some(path) => {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            warn!("Could not determine config directory, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Serialize a TOML config to disk
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}
