//! Connector configuration.
//!
//! Stored as TOML; every field is optional:
//!
//! ```toml
//! chunk_size = 65536
//! max_concurrent_transfers = 5
//! connect_timeout_ms = 10000
//! read_timeout_ms = 30000
//! retry_attempts = 2
//! retry_backoff_ms = 250
//! ```

use std::path::Path;
use std::time::Duration;

use depot_transfer::DEFAULT_CHUNK_SIZE;
use serde::{Deserialize, Serialize};

/// Errors from loading or saving a [`ConnectorConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Per-connector transfer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Bytes per chunk; one PROGRESSED event per chunk. 0 selects the default.
    pub chunk_size: usize,
    /// Upper bound on transfers of one batch running at the same time.
    pub max_concurrent_transfers: usize,
    /// Limit for opening a remote resource.
    pub connect_timeout_ms: u64,
    /// Limit for each chunk read or write.
    pub read_timeout_ms: u64,
    /// Extra attempts at opening a remote resource after a transient error.
    pub retry_attempts: u32,
    /// Delay before the first retry; grows linearly per attempt.
    pub retry_backoff_ms: u64,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrent_transfers: 5,
            connect_timeout_ms: 10_000,
            read_timeout_ms: 30_000,
            retry_attempts: 2,
            retry_backoff_ms: 250,
        }
    }
}

impl ConnectorConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ConnectorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the config at `path`, or the defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Writes the config to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid("connect_timeout_ms must be positive".into()));
        }
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::Invalid("read_timeout_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn chunk_size(&self) -> usize {
        if self.chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            self.chunk_size
        }
    }

    /// Effective concurrency, at least 1.
    pub fn concurrency(&self) -> usize {
        self.max_concurrent_transfers.max(1)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
