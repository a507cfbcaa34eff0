//! Unified error handling for the client.

use crate::config::ConfigError;
use cuentas_engine::OperationId;
use thiserror::Error;

/// Application error type.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("engine error: {0}")]
    Engine(#[from] cuentas_engine::Error),

    /// The remote store is unreachable or sync is disabled by configuration.
    /// Transient: the pending queue and watermark are untouched, retry later.
    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),

    /// The remote store rejected one operation (e.g. a protected-entity
    /// violation). The pass aborted; the operation retries until capped.
    #[error("remote rejected operation {op_id}: {reason}")]
    RemoteRejected { op_id: OperationId, reason: String },

    #[error("sync already in progress")]
    SyncInProgress,

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, SyncError>;
