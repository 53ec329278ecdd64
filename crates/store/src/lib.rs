//! Archive store: warm and cold tier primitives for Permafrost
//!
//! Purely structural layer over the archive root directory. It knows how
//! files are named, compressed, listed, and bundled, and nothing about
//! retention policy: the engine decides *what* to move, this crate decides
//! *how* it lands on disk.
//!
//! ## Layout
//!
//! ```text
//! <root>/warm/<YYYY-MM-DD>/<category>.jsonl[.gz]
//! <root>/cold/<YYYY>/<YYYY-MM>.tar.gz
//! ```

mod cold;
mod error;
mod layout;
mod warm;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};

pub use error::{StoreError, StoreResult};
pub use layout::{ColdBundle, WarmFile, BUNDLE_SUFFIX, COLD_DIR, WARM_DIR, WARM_SUFFIX, WARM_SUFFIX_GZ};
pub use warm::{warm_file_path, WarmReader};

/// Per-category slice of warm tier statistics.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CategoryFiles {
    /// Warm file count for the category.
    pub files: u64,
    /// Bytes across those files.
    pub bytes: u64,
}

/// Snapshot of what the archive root currently holds.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchiveStats {
    /// Warm file count.
    pub file_count: u64,
    /// Bytes across all warm files.
    pub total_bytes: u64,
    /// Warm usage broken down by category.
    pub per_category: BTreeMap<String, CategoryFiles>,
    /// Oldest warm file date present.
    pub oldest_date: Option<NaiveDate>,
    /// Newest warm file date present.
    pub newest_date: Option<NaiveDate>,
    /// Cold bundle count.
    pub bundle_count: u64,
    /// Bytes across all cold bundles.
    pub bundle_bytes: u64,
}

/// Handle to one archive root. Creates nothing until first written to.
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    root: PathBuf,
}

impl ArchiveStore {
    /// Wrap an archive root path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The archive root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn warm_root(&self) -> PathBuf {
        self.root.join(WARM_DIR)
    }

    fn cold_root(&self) -> PathBuf {
        self.root.join(COLD_DIR)
    }

    /// Append a batch of archived records to the warm file for
    /// (category, date). Durable (flushed and fsynced) on return.
    pub fn append_batch(
        &self,
        category: &str,
        date: NaiveDate,
        records: &[Map<String, Value>],
        compress: bool,
    ) -> StoreResult<PathBuf> {
        warm::append_batch(&self.warm_root(), category, date, records, compress)
    }

    /// Path the next `append_batch` for (category, date) will write to.
    pub fn warm_path(&self, category: &str, date: NaiveDate, compress: bool) -> PathBuf {
        warm::warm_file_path(&self.warm_root(), category, date, compress)
    }

    /// Open a warm file as a lazy record iterator.
    pub fn read_warm(&self, path: &Path) -> StoreResult<WarmReader> {
        warm::read_warm(path)
    }

    /// List warm files, optionally filtered by category and date range.
    pub fn list_warm(
        &self,
        category: Option<&str>,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Vec<WarmFile> {
        layout::list_warm_files(&self.warm_root(), category, range)
    }

    /// Remove consolidated warm files and prune dated directories left empty.
    pub fn remove_warm_files(&self, files: &[WarmFile]) -> StoreResult<()> {
        for file in files {
            fs::remove_file(&file.path)?;
        }
        let mut dirs: Vec<_> = files.iter().filter_map(|f| f.path.parent()).collect();
        dirs.sort();
        dirs.dedup();
        for dir in dirs {
            layout::prune_empty_dir(dir);
        }
        Ok(())
    }

    /// Write (or extend) the cold bundle for one month. See [`cold::write_bundle`].
    pub fn write_bundle(
        &self,
        year: i32,
        month: u32,
        files: &[WarmFile],
    ) -> StoreResult<PathBuf> {
        cold::write_bundle(&self.cold_root(), year, month, files)
    }

    /// Path the bundle for (year, month) lives (or would live) at.
    pub fn bundle_target(&self, year: i32, month: u32) -> PathBuf {
        cold::bundle_path(&self.cold_root(), year, month)
    }

    /// List cold bundles sorted by (year, month).
    pub fn list_bundles(&self) -> Vec<ColdBundle> {
        layout::list_cold_bundles(&self.cold_root())
    }

    /// Total records across a bundle's warm entries.
    pub fn bundle_record_count(&self, path: &Path) -> StoreResult<u64> {
        cold::bundle_record_count(path)
    }

    /// Delete a cold bundle; returns bytes freed.
    pub fn delete_bundle(&self, bundle: &ColdBundle) -> StoreResult<u64> {
        cold::delete_bundle(bundle)
    }

    /// Current warm and cold tier usage. Missing root → zeroed stats.
    pub fn stats(&self) -> ArchiveStats {
        let mut stats = ArchiveStats::default();

        for file in self.list_warm(None, None) {
            let bytes = fs::metadata(&file.path).map(|m| m.len()).unwrap_or(0);
            stats.file_count += 1;
            stats.total_bytes += bytes;
            let per = stats.per_category.entry(file.category.clone()).or_default();
            per.files += 1;
            per.bytes += bytes;
            stats.oldest_date = Some(match stats.oldest_date {
                Some(d) if d <= file.date => d,
                _ => file.date,
            });
            stats.newest_date = Some(match stats.newest_date {
                Some(d) if d >= file.date => d,
                _ => file.date,
            });
        }

        for bundle in self.list_bundles() {
            stats.bundle_count += 1;
            stats.bundle_bytes += bundle.bytes;
        }

        stats
    }
}
