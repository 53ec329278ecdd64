//! Permafrost engine: archive, consolidate, purge
//!
//! Orchestrates the hot store accessor and the archive store under the
//! retention registry. Three batch operations, all synchronous, all built
//! around one invariant: data is written durably to the destination tier
//! before the source copy is deleted.
//!
//! - [`Archiver`] moves aged hot records into warm files.
//! - [`consolidate`] folds aged warm files into monthly cold bundles.
//! - [`purge`] deletes cold bundles past the retention horizon.
//!
//! These are designed to be invoked by an external scheduler via the CLI;
//! [`RunLock`] serializes runs that share an archive root.

mod archiver;
mod consolidate;
mod error;
mod lock;
mod purge;
mod status;

pub use archiver::{ArchiveOptions, Archiver};
pub use consolidate::consolidate;
pub use error::{EngineError, EngineResult};
pub use lock::RunLock;
pub use purge::purge;
pub use status::retention_status;
