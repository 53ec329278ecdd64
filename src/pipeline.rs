//! Pipeline: one handle over the hot store, archive store, and registry
//!
//! This is the surface the CLI (and embedding code) drives. Every mutating
//! run takes an advisory lock under the archive root so overlapping
//! invocations against the same data are serialized; dry-runs skip the lock
//! because they must not create anything, not even the root directory.

use std::path::Path;

use chrono::{DateTime, Utc};

use permafrost_core::{
    ArchiveReport, CleanupReport, RetentionPolicy, RetentionRegistry, StatusReport,
};
use permafrost_engine::{consolidate, purge, retention_status, ArchiveOptions, Archiver, RunLock};
use permafrost_hot::HotStore;
use permafrost_store::ArchiveStore;

use crate::error::Result;

/// Settings for one `cleanup archives` run.
#[derive(Debug, Clone)]
pub struct CleanupOptions {
    /// Consolidate warm files older than this many days.
    pub older_than_days: u32,
    /// Skip the purge half.
    pub consolidate_only: bool,
    /// Skip the consolidation half.
    pub purge_only: bool,
    /// Report what would happen, mutate nothing.
    pub dry_run: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            older_than_days: 30,
            consolidate_only: false,
            purge_only: false,
            dry_run: false,
        }
    }
}

/// The assembled archival pipeline.
pub struct Pipeline {
    hot: HotStore,
    store: ArchiveStore,
    registry: RetentionRegistry,
}

impl Pipeline {
    /// Open the hot database and bind the archive root and registry.
    pub fn open(db: &Path, archive_root: &Path, registry: RetentionRegistry) -> Result<Self> {
        Ok(Self {
            hot: HotStore::open(db)?,
            store: ArchiveStore::new(archive_root),
            registry,
        })
    }

    /// Like [`Pipeline::open`] but with the hot database opened read-only.
    ///
    /// Inspection commands go through this so they can never create or
    /// mutate the database, not even an empty file.
    pub fn open_read_only(
        db: &Path,
        archive_root: &Path,
        registry: RetentionRegistry,
    ) -> Result<Self> {
        Ok(Self {
            hot: HotStore::open_read_only(db)?,
            store: ArchiveStore::new(archive_root),
            registry,
        })
    }

    /// Archive aged records for the target (`all`, a class, or a category).
    pub fn archive(
        &mut self,
        target: &str,
        options: ArchiveOptions,
        now: DateTime<Utc>,
    ) -> Result<ArchiveReport> {
        let _lock = if options.dry_run {
            None
        } else {
            Some(RunLock::acquire(self.store.root(), "archive")?)
        };
        let mut archiver = Archiver::new(&mut self.hot, &self.store, &self.registry, options);
        Ok(archiver.archive_target(target, now))
    }

    /// Consolidate and/or purge the archive tiers.
    pub fn cleanup(&self, options: CleanupOptions, now: DateTime<Utc>) -> Result<CleanupReport> {
        let _lock = if options.dry_run {
            None
        } else {
            Some(RunLock::acquire(self.store.root(), "cleanup")?)
        };

        let consolidated = if options.purge_only {
            None
        } else {
            Some(consolidate(
                &self.store,
                options.older_than_days,
                options.dry_run,
                now,
            ))
        };
        let purged = if options.consolidate_only {
            None
        } else {
            Some(purge(&self.store, &self.registry, options.dry_run, now))
        };

        Ok(CleanupReport {
            consolidate: consolidated,
            purge: purged,
            dry_run: options.dry_run,
        })
    }

    /// Hot/warm/cold usage per configured category.
    pub fn status(&self) -> Result<StatusReport> {
        Ok(retention_status(&self.hot, &self.store, &self.registry)?)
    }

    /// The configured policies, in category order.
    pub fn policies(&self) -> Vec<&RetentionPolicy> {
        self.registry.all().collect()
    }

    /// The registry this pipeline runs under.
    pub fn registry(&self) -> &RetentionRegistry {
        &self.registry
    }

    /// The archive store (listing, stats).
    pub fn store(&self) -> &ArchiveStore {
        &self.store
    }

    /// The hot store accessor.
    pub fn hot(&self) -> &HotStore {
        &self.hot
    }
}
