//! Core types for the Permafrost archival engine
//!
//! This crate defines the vocabulary shared by every other layer:
//! retention policies, the registry that maps categories to them,
//! record representations, run reports, and duration parsing.
//!
//! Nothing here touches the filesystem or the hot store; the crate is
//! pure data so that the store, accessor, and engine crates can all
//! depend on it without pulling in I/O dependencies.

pub mod duration;
pub mod policy;
pub mod record;
pub mod report;

pub use duration::{parse_duration, DurationError};
pub use policy::{PolicyError, RetentionPolicy, RetentionRegistry};
pub use record::{Cursor, HotRecord, ARCHIVED_AT_FIELD};
pub use report::{
    ArchiveReport, BundleOutcome, CategoryOutcome, CategoryStatus, CategoryUsage, CleanupReport,
    ConsolidateReport, PurgeReport, PurgedBundle, StatusReport, TierUsage,
};
