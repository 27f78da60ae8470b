//! Bootstrap configuration loading and root folder resolution
//!
//! Configuration sources, highest priority first:
//! 1. Command-line arguments (applied by the binary after loading)
//! 2. Environment variables (`TOOLCAT_*`)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! A missing TOML file is never fatal: a warning is logged and defaults are used.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default HTTP port for the import service
pub const DEFAULT_PORT: u16 = 5731;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "TOOLCAT_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Data folder holding the SQLite database
    ///
    /// If not specified, falls back to the OS-dependent default
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub enrichment: EnrichmentConfig,

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

/// Enrichment service connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    /// Endpoint accepting enrichment requests (POST, JSON)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bearer token sent with every request, if set
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Batch import tuning
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Pause between records, throttling outbound enrichment/store traffic
    #[serde(default = "default_item_delay_ms")]
    pub item_delay_ms: u64,

    /// Largest batch accepted by a single run
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Source tag written on every imported record and sent to enrichment
    #[serde(default = "default_source_tag")]
    pub source_tag: String,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_item_delay_ms() -> u64 {
    100
}

fn default_max_batch_size() -> usize {
    1000
}

fn default_source_tag() -> String {
    "batch-import".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            item_delay_ms: default_item_delay_ms(),
            max_batch_size: default_max_batch_size(),
            source_tag: default_source_tag(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            root_folder: None,
            logging: LoggingConfig::default(),
            enrichment: EnrichmentConfig::default(),
            import: ImportConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))
    }

    /// Apply `TOOLCAT_*` environment overrides on top of file values
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("TOOLCAT_PORT") {
            match port.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => warn!("Ignoring invalid TOOLCAT_PORT value: {}", port),
            }
        }

        if let Ok(folder) = std::env::var("TOOLCAT_ROOT_FOLDER") {
            if !folder.trim().is_empty() {
                self.root_folder = Some(PathBuf::from(folder));
            }
        }

        if let Ok(url) = std::env::var("TOOLCAT_ENRICHMENT_URL") {
            if !url.trim().is_empty() {
                self.enrichment.endpoint = Some(url);
            }
        }

        if let Ok(key) = std::env::var("TOOLCAT_ENRICHMENT_API_KEY") {
            if !key.trim().is_empty() {
                self.enrichment.api_key = Some(key);
            }
        }
    }

    /// Effective data folder: configured value or OS default
    pub fn resolved_root_folder(&self) -> PathBuf {
        self.root_folder
            .clone()
            .unwrap_or_else(default_root_folder)
    }
}

/// Locates and loads the bootstrap configuration
///
/// File lookup order: explicit path → `TOOLCAT_CONFIG` → user config dir.
pub struct ConfigResolver {
    explicit_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(explicit_path: Option<PathBuf>) -> Self {
        Self { explicit_path }
    }

    /// Path of the config file that would be read, if any exists
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.explicit_path {
            return Some(path.clone());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }

        dirs::config_dir()
            .map(|d| d.join("toolcat").join("config.toml"))
            .filter(|p| p.exists())
    }

    /// Load config file (if any) and apply environment overrides
    ///
    /// A missing or unreadable file logs a warning and falls back to defaults.
    /// A file that exists but fails to parse is an error.
    pub fn load(&self) -> Result<TomlConfig> {
        let mut config = match self.config_path() {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                TomlConfig::from_file(&path)?
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                TomlConfig::default()
            }
            None => {
                info!("No config file found, using built-in defaults");
                TomlConfig::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }
}

/// Creates the data folder and derives file locations inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder (and parents) if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            info!("Creating root folder: {}", self.root_folder.display());
            std::fs::create_dir_all(&self.root_folder)?;
        }
        if !self.root_folder.is_dir() {
            return Err(Error::Config(format!(
                "Root folder is not a directory: {}",
                self.root_folder.display()
            )));
        }
        Ok(())
    }

    /// SQLite database path inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join("toolcat.db")
    }
}

/// OS-dependent default data folder
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("toolcat"))
        .unwrap_or_else(|| PathBuf::from("./toolcat_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.import.item_delay_ms, 100);
        assert_eq!(config.import.max_batch_size, 1000);
        assert_eq!(config.import.source_tag, "batch-import");
        assert_eq!(config.enrichment.timeout_secs, 60);
        assert!(config.enrichment.endpoint.is_none());
    }

    #[test]
    fn test_partial_sections_keep_field_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
            port = 6000

            [import]
            item_delay_ms = 5

            [enrichment]
            endpoint = "http://localhost:9000/enrich"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 6000);
        assert_eq!(config.import.item_delay_ms, 5);
        assert_eq!(config.import.max_batch_size, 1000);
        assert_eq!(
            config.enrichment.endpoint.as_deref(),
            Some("http://localhost:9000/enrich")
        );
        assert_eq!(config.enrichment.timeout_secs, 60);
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("port = \"not a number\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_database_path_inside_root() {
        let init = RootFolderInitializer::new(PathBuf::from("/tmp/toolcat-test"));
        assert_eq!(
            init.database_path(),
            PathBuf::from("/tmp/toolcat-test/toolcat.db")
        );
    }
}
