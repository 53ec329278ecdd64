//! Run reports surfaced to the driver
//!
//! Every archiver or cleanup invocation produces one report value. Reports
//! are ephemeral: they are rendered (human or JSON) and dropped, never
//! persisted. The JSON form mirrors the human-readable form field-for-field
//! so scripts and operators see the same data.

use std::path::PathBuf;

use serde::Serialize;

/// Outcome of one category within an archive run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus {
    /// Records were migrated to the warm tier.
    Archived,
    /// Nothing older than the cutoff.
    NoRecords,
    /// Category is configured exempt; never processed.
    Exempt,
    /// No policy configured for this category.
    NoPolicy,
    /// Dry-run: reported counts, mutated nothing.
    DryRun,
    /// Transient store or data failure; other categories unaffected.
    Failed,
}

/// Per-category result of an archive run.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryOutcome {
    /// Category processed.
    pub category: String,
    /// What happened.
    pub status: CategoryStatus,
    /// Records archived (or that would be, for dry-run).
    pub records: u64,
    /// Warm file written, when one was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Failure detail for `Failed` outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CategoryOutcome {
    /// Outcome with no records and no file, for the short-circuit statuses.
    pub fn empty(category: &str, status: CategoryStatus) -> Self {
        Self {
            category: category.to_string(),
            status,
            records: 0,
            path: None,
            error: None,
        }
    }

    /// Failed outcome carrying the error text.
    pub fn failed(category: &str, error: impl ToString) -> Self {
        Self {
            category: category.to_string(),
            status: CategoryStatus::Failed,
            records: 0,
            path: None,
            error: Some(error.to_string()),
        }
    }
}

/// Aggregate result of one archive invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveReport {
    /// One entry per category processed.
    pub outcomes: Vec<CategoryOutcome>,
    /// Whether this run was a simulation.
    pub dry_run: bool,
}

impl ArchiveReport {
    /// True when at least one category hit a transient or data error.
    ///
    /// `no_policy` and `exempt` are configuration outcomes, not failures.
    pub fn is_failure(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.status == CategoryStatus::Failed)
    }

    /// Total records archived (or simulated) across categories.
    pub fn total_records(&self) -> u64 {
        self.outcomes.iter().map(|o| o.records).sum()
    }
}

/// One monthly bundle produced (or simulated) by consolidation.
#[derive(Debug, Clone, Serialize)]
pub struct BundleOutcome {
    /// Bundle year.
    pub year: i32,
    /// Bundle month (1-12).
    pub month: u32,
    /// Bundle path.
    pub path: PathBuf,
    /// Warm files consolidated into this bundle.
    pub files: u64,
    /// Records inside those files.
    pub records: u64,
    /// Failure detail; the month's warm files were left in place.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of one consolidation pass.
#[derive(Debug, Clone, Serialize)]
pub struct ConsolidateReport {
    /// Per-month outcomes.
    pub bundles: Vec<BundleOutcome>,
    /// Warm files removed (or that would be).
    pub files_consolidated: u64,
    /// Records moved to the cold tier (or that would be).
    pub records: u64,
    /// Whether this run was a simulation.
    pub dry_run: bool,
}

impl ConsolidateReport {
    /// True when any month failed to bundle.
    pub fn is_failure(&self) -> bool {
        self.bundles.iter().any(|b| b.error.is_some())
    }
}

/// One cold bundle deleted (or eligible) by a purge pass.
#[derive(Debug, Clone, Serialize)]
pub struct PurgedBundle {
    /// Bundle year.
    pub year: i32,
    /// Bundle month (1-12).
    pub month: u32,
    /// Bundle path.
    pub path: PathBuf,
    /// Size on disk.
    pub bytes: u64,
}

/// Result of one purge pass.
#[derive(Debug, Clone, Serialize)]
pub struct PurgeReport {
    /// Bundles deleted (or eligible, for dry-run).
    pub purged: Vec<PurgedBundle>,
    /// Bytes freed (or reclaimable).
    pub bytes_freed: u64,
    /// Bundles that could not be deleted.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Whether this run was a simulation.
    pub dry_run: bool,
}

/// Combined result of one `cleanup archives` invocation.
///
/// Either half may be absent when the run was restricted with
/// `--consolidate-only` / `--purge-only`.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    /// Consolidation outcome, unless purge-only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consolidate: Option<ConsolidateReport>,
    /// Purge outcome, unless consolidate-only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purge: Option<PurgeReport>,
    /// Whether this run was a simulation.
    pub dry_run: bool,
}

impl CleanupReport {
    /// True when any month failed to bundle or any bundle failed to delete.
    pub fn is_failure(&self) -> bool {
        self.consolidate.as_ref().is_some_and(|c| c.is_failure())
            || self.purge.as_ref().is_some_and(|p| !p.errors.is_empty())
    }
}

/// Per-category usage for `retention status`.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryUsage {
    /// Category name.
    pub category: String,
    /// Rows currently in the hot store.
    pub hot_rows: u64,
    /// Warm files belonging to this category.
    pub warm_files: u64,
    /// Bytes across those files.
    pub warm_bytes: u64,
}

/// Aggregate usage of one tier.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TierUsage {
    /// File (or bundle) count.
    pub files: u64,
    /// Total size on disk.
    pub bytes: u64,
}

/// Output of `retention status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Per-category breakdown for configured categories.
    pub categories: Vec<CategoryUsage>,
    /// Warm tier totals.
    pub warm: TierUsage,
    /// Cold tier totals.
    pub cold: TierUsage,
}
