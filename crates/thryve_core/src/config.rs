//! TOML configuration for the core.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration.
//!
//! ```toml
//! [storage]
//! db_path = "/data/thryve.sqlite3"
//!
//! [logging]
//! level = "info"
//! log_dir = "/data/logs"
//!
//! [ingest]
//! fetch_timeout_ms = 10000
//!
//! [gmail]
//! api_base = "https://gmail.googleapis.com/gmail/v1/users/me"
//! max_results = 10
//! ```

use crate::logging::default_log_level;
use crate::pipeline::PipelineConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_DB_FILE_NAME: &str = "thryve.sqlite3";
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const DEFAULT_GMAIL_MAX_RESULTS: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub ingest: IngestConfig,
    pub gmail: GmailConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// File logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Per adapter call budget; an overrun counts as a transport failure.
    pub fetch_timeout_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
        }
    }
}

impl IngestConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GmailConfig {
    pub api_base: String,
    pub max_results: u32,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_GMAIL_API_BASE.to_string(),
            max_results: DEFAULT_GMAIL_MAX_RESULTS,
        }
    }
}

impl CoreConfig {
    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("storage.db_path must not be empty".to_string()));
        }
        if self.ingest.fetch_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "ingest.fetch_timeout_ms must be positive".to_string(),
            ));
        }
        if self.gmail.max_results == 0 {
            return Err(ConfigError::Invalid(
                "gmail.max_results must be positive".to_string(),
            ));
        }
        if self.gmail.api_base.trim().is_empty() {
            return Err(ConfigError::Invalid("gmail.api_base must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            fetch_timeout: self.ingest.fetch_timeout(),
        }
    }
}
