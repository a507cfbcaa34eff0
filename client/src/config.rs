//! Configuration management for the client.

use std::env;
use std::path::PathBuf;

/// Client configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Owner all local and remote state is scoped to
    pub owner_id: String,
    /// Directory holding the persisted state files
    pub data_dir: PathBuf,
    /// Capability flag: whether a remote store is configured at all.
    /// When false the client is purely local and sync is rejected.
    pub remote_enabled: bool,
    /// Largest batch submitted per remote write (the provider limits
    /// atomic batch size; oversized queues are chunked)
    pub batch_limit: usize,
    /// Rejected-operation retries before the operation is dropped
    pub max_push_attempts: u32,
}

impl Config {
    /// Programmatic configuration; used by tests and embedders.
    pub fn new(owner_id: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            owner_id: owner_id.into(),
            data_dir: data_dir.into(),
            remote_enabled: false,
            batch_limit: 500,
            max_push_attempts: 5,
        }
    }

    pub fn with_remote(mut self, enabled: bool) -> Self {
        self.remote_enabled = enabled;
        self
    }

    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = limit.max(1);
        self
    }

    pub fn with_max_push_attempts(mut self, attempts: u32) -> Self {
        self.max_push_attempts = attempts.max(1);
        self
    }

    /// Load configuration from environment variables (and a `.env` file if
    /// one is present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let owner_id = env::var("CUENTAS_OWNER_ID").unwrap_or_else(|_| "local".to_string());

        let data_dir = env::var("CUENTAS_DATA_DIR")
            .unwrap_or_else(|_| "./data".to_string())
            .into();

        let remote_enabled = match env::var("CUENTAS_REMOTE_ENABLED") {
            Err(_) => false,
            Ok(v) if v.eq_ignore_ascii_case("true") => true,
            Ok(v) if v.eq_ignore_ascii_case("false") => false,
            Ok(_) => return Err(ConfigError::InvalidRemoteEnabled),
        };

        let batch_limit = env::var("CUENTAS_BATCH_LIMIT")
            .unwrap_or_else(|_| "500".to_string())
            .parse::<usize>()
            .ok()
            .filter(|l| *l >= 1)
            .ok_or(ConfigError::InvalidBatchLimit)?;

        let max_push_attempts = env::var("CUENTAS_MAX_PUSH_ATTEMPTS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .ok()
            .filter(|a| *a >= 1)
            .ok_or(ConfigError::InvalidMaxPushAttempts)?;

        Ok(Self {
            owner_id,
            data_dir,
            remote_enabled,
            batch_limit,
            max_push_attempts,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("CUENTAS_REMOTE_ENABLED must be 'true' or 'false'")]
    InvalidRemoteEnabled,

    #[error("CUENTAS_BATCH_LIMIT must be a positive integer")]
    InvalidBatchLimit,

    #[error("CUENTAS_MAX_PUSH_ATTEMPTS must be a positive integer")]
    InvalidMaxPushAttempts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = Config::new("owner", "/tmp/cuentas");
        assert_eq!(config.owner_id, "owner");
        assert!(!config.remote_enabled);
        assert_eq!(config.batch_limit, 500);
        assert_eq!(config.max_push_attempts, 5);
    }

    #[test]
    fn builder_clamps_to_minimums() {
        let config = Config::new("owner", "/tmp/cuentas")
            .with_batch_limit(0)
            .with_max_push_attempts(0);
        assert_eq!(config.batch_limit, 1);
        assert_eq!(config.max_push_attempts, 1);
    }
}
