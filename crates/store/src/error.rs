//! Archive store error type

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by warm and cold tier operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record line is not valid JSON.
    #[error("malformed record in {path}: {source}")]
    MalformedRecord {
        /// File containing the bad line.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// A record could not be serialized for writing.
    #[error("failed to serialize record: {0}")]
    Serialize(#[source] serde_json::Error),

    /// A cold bundle's contents could not be read.
    #[error("corrupt bundle {path}: {detail}")]
    CorruptBundle {
        /// Bundle path.
        path: PathBuf,
        /// What went wrong.
        detail: String,
    },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
