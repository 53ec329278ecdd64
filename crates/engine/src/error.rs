//! Engine error type

use thiserror::Error;

/// Errors raised while orchestrating archival and cleanup.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Hot store access failed.
    #[error(transparent)]
    Hot(#[from] permafrost_hot::HotStoreError),

    /// Warm/cold tier access failed.
    #[error(transparent)]
    Store(#[from] permafrost_store::StoreError),

    /// Another archival run already holds the lock for this root.
    #[error("another run is already in progress (lock file: {0})")]
    Locked(String),

    /// Lock file could not be created or removed.
    #[error("lock I/O error: {0}")]
    LockIo(#[from] std::io::Error),
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
