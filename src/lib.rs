//! # Permafrost
//!
//! Tiered retention and archival engine for agent event stores.
//!
//! Producers write observability records (events, tool calls, metrics,
//! logs) into a SQLite hot store; Permafrost ages them through three tiers
//! under per-category retention policies:
//!
//! ```text
//! hot (SQLite) → warm (<root>/warm/<date>/<category>.jsonl.gz)
//!              → cold (<root>/cold/<year>/<year-month>.tar.gz) → deleted
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use chrono::Utc;
//! use permafrost::{ArchiveOptions, Pipeline, RetentionRegistry};
//!
//! let mut pipeline = Pipeline::open(
//!     "./events.db".as_ref(),
//!     "./archive".as_ref(),
//!     RetentionRegistry::builtin(),
//! )?;
//!
//! // Move records past their hot window into warm files.
//! let report = pipeline.archive("all", ArchiveOptions::default(), Utc::now())?;
//!
//! // Bundle month-old warm files and drop expired bundles.
//! let cleanup = pipeline.cleanup(Default::default(), Utc::now())?;
//! ```
//!
//! ## Guarantees
//!
//! - **Write before delete**: a record is removed from a tier only after it
//!   is durably written to the next one. Crashes can duplicate, never lose.
//! - **Idempotent re-runs**: an immediate second archive run reports
//!   `no_records`; re-consolidation skips already-bundled files.
//! - **Dry-run purity**: simulation reports counts and touches nothing.
//! - **Category isolation**: one category's failure never stops another's.

#![warn(missing_docs)]

mod error;
mod pipeline;

pub use error::{Error, Result};
pub use pipeline::{CleanupOptions, Pipeline};

// Re-export the pieces callers need to drive the pipeline.
pub use permafrost_core::{
    parse_duration, ArchiveReport, BundleOutcome, CategoryOutcome, CategoryStatus, CategoryUsage,
    CleanupReport, ConsolidateReport, DurationError, PurgeReport, PurgedBundle, RetentionPolicy,
    RetentionRegistry, StatusReport, TierUsage,
};
pub use permafrost_engine::{ArchiveOptions, EngineError};
pub use permafrost_hot::HotStore;
pub use permafrost_store::{ArchiveStats, ArchiveStore, ColdBundle, WarmFile};
