//! Replacement tunables loaded from TOML
//!
//! ```toml
//! delete_batch_size = 2
//! delete_attempts = 3
//! conflict_backoff_ms = 500
//! batch_pause_ms = 400
//! append_chunk_size = 100
//! policy = "strict"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::retry::RetryConfig;
use crate::store::MAX_APPEND_CHUNK;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// What to do with a block that still fails to delete after retries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Abort the replacement on the first failed delete
    #[default]
    Strict,
    /// Log, count the block as skipped and keep going
    Lenient,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Deletes issued concurrently per batch
    pub delete_batch_size: usize,
    /// Attempts per delete, first try included
    pub delete_attempts: u32,
    pub conflict_backoff_ms: u64,
    /// Pause after every delete batch
    pub batch_pause_ms: u64,
    /// Blocks per append call, at most [`MAX_APPEND_CHUNK`]
    pub append_chunk_size: usize,
    pub policy: DeletePolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            delete_batch_size: 2,
            delete_attempts: 3,
            conflict_backoff_ms: 500,
            batch_pause_ms: 400,
            append_chunk_size: MAX_APPEND_CHUNK,
            policy: DeletePolicy::Strict,
        }
    }
}

impl SyncConfig {
    /// Location used when no explicit path is given
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("docsync").join("config.toml"))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from `path`, or from the default location when it exists,
    /// or fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delete_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "delete_batch_size must be at least 1".into(),
            ));
        }
        if self.delete_attempts == 0 {
            return Err(ConfigError::Invalid(
                "delete_attempts must be at least 1".into(),
            ));
        }
        if self.append_chunk_size == 0 || self.append_chunk_size > MAX_APPEND_CHUNK {
            return Err(ConfigError::Invalid(format!(
                "append_chunk_size must be between 1 and {}",
                MAX_APPEND_CHUNK
            )));
        }
        Ok(())
    }

    pub fn conflict_backoff(&self) -> Duration {
        Duration::from_millis(self.conflict_backoff_ms)
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    /// Chunk size actually used, clamped to what the store accepts
    pub fn chunk_size(&self) -> usize {
        self.append_chunk_size.clamp(1, MAX_APPEND_CHUNK)
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.delete_attempts.max(1),
            backoff: self.conflict_backoff(),
        }
    }
}
