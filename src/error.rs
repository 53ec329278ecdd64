//! Unified error type for the facade

use thiserror::Error;

/// Any failure surfaced by the [`crate::Pipeline`].
#[derive(Debug, Error)]
pub enum Error {
    /// Policy configuration problem.
    #[error(transparent)]
    Policy(#[from] permafrost_core::PolicyError),

    /// Malformed duration argument.
    #[error(transparent)]
    Duration(#[from] permafrost_core::DurationError),

    /// Hot store failure.
    #[error(transparent)]
    Hot(#[from] permafrost_hot::HotStoreError),

    /// Warm/cold tier failure.
    #[error(transparent)]
    Store(#[from] permafrost_store::StoreError),

    /// Engine failure, including lock contention.
    #[error(transparent)]
    Engine(#[from] permafrost_engine::EngineError),
}

/// Result alias used across the facade.
pub type Result<T> = std::result::Result<T, Error>;
