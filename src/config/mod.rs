use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::validation::validate_endpoint;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// GraphQL endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:8000/graphql/".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            file_name: default_file_name(),
        }
    }
}

impl StorageConfig {
    /// Full path of the session store file
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_file_name() -> String {
    "session.json".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
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

impl Config {
    /// Read `path`, or defaults when it does not exist.
    ///
    /// Values are not validated here so command-line overrides can still
    /// replace them; call [`Config::validate`] once they are applied.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| "Failed to parse configuration file")?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Log where the configuration came from. Call after logging is set up.
    pub fn log_source(path: &Path) {
        if path.exists() {
            info!("Loaded configuration from {}", path.display());
        } else {
            info!("No config file found at {}, using defaults", path.display());
        }
    }

    pub fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            storage: StorageConfig::default(),
            listing: ListingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Err(e) = validate_endpoint(&self.api.endpoint) {
            bail!("Invalid [api] endpoint '{}': {}", self.api.endpoint, e);
        }
        if self.api.timeout_secs == 0 {
            bail!("[api] timeout_secs must be greater than zero");
        }
        if self.storage.file_name.trim().is_empty() {
            bail!("[storage] file_name must not be empty");
        }
        if self.listing.page_size == 0 {
            bail!("[listing] page_size must be greater than zero");
        }
        Ok(())
    }
}
