//! On-disk layout of the warm and cold tiers
//!
//! ```text
//! <root>/warm/<YYYY-MM-DD>/<category>.jsonl[.gz]
//! <root>/cold/<YYYY>/<YYYY-MM>.tar.gz
//! ```
//!
//! Listing is tolerant by design: a missing root yields empty results and
//! entries whose names do not parse are skipped, so foreign files dropped
//! into the tree never break a run.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::debug;

/// Warm tier subdirectory name.
pub const WARM_DIR: &str = "warm";
/// Cold tier subdirectory name.
pub const COLD_DIR: &str = "cold";
/// Uncompressed warm file suffix.
pub const WARM_SUFFIX: &str = ".jsonl";
/// Compressed warm file suffix.
pub const WARM_SUFFIX_GZ: &str = ".jsonl.gz";
/// Cold bundle suffix.
pub const BUNDLE_SUFFIX: &str = ".tar.gz";

/// One warm tier file: (category, date) plus its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmFile {
    /// Full path on disk.
    pub path: PathBuf,
    /// Date of the archival run that created the file (directory name).
    pub date: NaiveDate,
    /// Category the records belong to (file stem).
    pub category: String,
}

impl WarmFile {
    /// Entry name used when the file is placed into a cold bundle:
    /// the original dated subpath, e.g. `2026-07-01/events.jsonl.gz`.
    pub fn bundle_entry_name(&self) -> String {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}/{}", self.date.format("%Y-%m-%d"), file_name)
    }
}

/// One cold tier bundle: (year, month) plus path and size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColdBundle {
    /// Full path on disk.
    pub path: PathBuf,
    /// Bundle year.
    pub year: i32,
    /// Bundle month (1-12).
    pub month: u32,
    /// Size on disk in bytes.
    pub bytes: u64,
}

/// Split a warm file name into its category, if it has a warm suffix.
pub fn warm_category(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(WARM_SUFFIX_GZ)
        .or_else(|| file_name.strip_suffix(WARM_SUFFIX))
}

/// Parse a dated warm directory name (`YYYY-MM-DD`).
pub fn parse_date_dir(name: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(name, "%Y-%m-%d").ok()
}

/// Parse a cold bundle file name (`YYYY-MM.tar.gz`) into (year, month).
pub fn parse_bundle_name(file_name: &str) -> Option<(i32, u32)> {
    let stem = file_name.strip_suffix(BUNDLE_SUFFIX)?;
    let (year, month) = stem.split_at(stem.find('-')?);
    let month = &month[1..];
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    if (1..=12).contains(&month) {
        Some((year, month))
    } else {
        None
    }
}

/// List warm files, optionally filtered by category and inclusive date range.
///
/// Results are sorted by (date, category) so callers see a deterministic
/// order. A missing warm root is an empty listing, not an error.
pub fn list_warm_files(
    warm_root: &Path,
    category: Option<&str>,
    range: Option<(NaiveDate, NaiveDate)>,
) -> Vec<WarmFile> {
    let mut files = Vec::new();
    let Ok(dirs) = fs::read_dir(warm_root) else {
        return files;
    };

    for dir in dirs.flatten() {
        let dir_name = dir.file_name();
        let Some(date) = parse_date_dir(&dir_name.to_string_lossy()) else {
            debug!(dir = %dir_name.to_string_lossy(), "skipping non-date entry in warm tier");
            continue;
        };
        if let Some((start, end)) = range {
            if date < start || date > end {
                continue;
            }
        }
        let Ok(entries) = fs::read_dir(dir.path()) else {
            continue;
        };
        for entry in entries.flatten() {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(file_category) = warm_category(&file_name) else {
                continue;
            };
            if let Some(wanted) = category {
                if file_category != wanted {
                    continue;
                }
            }
            files.push(WarmFile {
                path: entry.path(),
                date,
                category: file_category.to_string(),
            });
        }
    }

    files.sort_by(|a, b| (a.date, &a.category).cmp(&(b.date, &b.category)));
    files
}

/// List cold bundles, sorted by (year, month). Missing root → empty.
pub fn list_cold_bundles(cold_root: &Path) -> Vec<ColdBundle> {
    let mut bundles = Vec::new();
    let Ok(years) = fs::read_dir(cold_root) else {
        return bundles;
    };

    for year_dir in years.flatten() {
        let Ok(entries) = fs::read_dir(year_dir.path()) else {
            continue;
        };
        for entry in entries.flatten() {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some((year, month)) = parse_bundle_name(&file_name) else {
                continue;
            };
            let bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
            bundles.push(ColdBundle {
                path: entry.path(),
                year,
                month,
                bytes,
            });
        }
    }

    bundles.sort_by_key(|b| (b.year, b.month));
    bundles
}

/// Remove a dated warm directory if nothing is left inside it.
pub fn prune_empty_dir(dir: &Path) {
    if let Ok(mut entries) = fs::read_dir(dir) {
        if entries.next().is_none() {
            let _ = fs::remove_dir(dir);
        }
    }
}
