//! Cold tier: monthly tar.gz bundles of warm files
//!
//! A bundle holds every warm file consolidated for one calendar month,
//! under its original dated subpath (`<YYYY-MM-DD>/<file>`), so standard
//! tools (tar, zcat, jq) can inspect contents. Bundles are rebuilt through
//! a temp file and renamed into place; the source warm files are only
//! deleted by the caller after the rename succeeds.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Archive, Builder};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::layout::{ColdBundle, WarmFile, BUNDLE_SUFFIX};
use crate::warm::count_records_in_bytes;

/// Path of the bundle for (year, month) under the cold root.
pub fn bundle_path(cold_root: &Path, year: i32, month: u32) -> PathBuf {
    cold_root
        .join(format!("{year:04}"))
        .join(format!("{year:04}-{month:02}{BUNDLE_SUFFIX}"))
}

/// Write (or extend) the bundle for one month with the given warm files.
///
/// If the bundle already exists, its entries are carried over first;
/// a warm file whose entry path is already present is skipped, so a file
/// is never archived twice. The new bundle is assembled in a `.tmp`
/// sibling, fsynced, and renamed over the target. Returns the bundle path.
pub fn write_bundle(
    cold_root: &Path,
    year: i32,
    month: u32,
    files: &[WarmFile],
) -> StoreResult<PathBuf> {
    let path = bundle_path(cold_root, year, month);
    let dir = path
        .parent()
        .ok_or_else(|| StoreError::CorruptBundle {
            path: path.clone(),
            detail: "bundle path has no parent".to_string(),
        })?
        .to_path_buf();
    fs::create_dir_all(&dir)?;

    let tmp = dir.join(format!("{year:04}-{month:02}{BUNDLE_SUFFIX}.tmp"));
    let out = File::create(&tmp)?;
    let encoder = GzEncoder::new(BufWriter::new(out), Compression::default());
    let mut builder = Builder::new(encoder);

    // Carry over entries from an existing bundle for this month.
    let mut present = HashSet::new();
    if path.exists() {
        for (name, data) in read_entries(&path)? {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, &name, data.as_slice())?;
            present.insert(name);
        }
    }

    for file in files {
        let entry_name = file.bundle_entry_name();
        if present.contains(&entry_name) {
            debug!(entry = %entry_name, "already bundled, skipping");
            continue;
        }
        builder.append_path_with_name(&file.path, &entry_name)?;
        present.insert(entry_name);
    }

    let encoder = builder.into_inner()?;
    let writer = encoder.finish()?;
    let file = writer
        .into_inner()
        .map_err(|e| StoreError::Io(e.into_error()))?;
    file.sync_all()?;
    fs::rename(&tmp, &path)?;

    Ok(path)
}

/// All (entry name, raw bytes) pairs inside a bundle.
pub fn read_entries(path: &Path) -> StoreResult<Vec<(String, Vec<u8>)>> {
    let file = File::open(path)?;
    let mut archive = Archive::new(GzDecoder::new(BufReader::new(file)));
    let mut entries = Vec::new();

    let iter = archive.entries().map_err(|e| StoreError::CorruptBundle {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    for entry in iter {
        let mut entry = entry.map_err(|e| StoreError::CorruptBundle {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let name = entry
            .path()
            .map_err(|e| StoreError::CorruptBundle {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?
            .to_string_lossy()
            .into_owned();
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        entries.push((name, data));
    }
    Ok(entries)
}

/// Total records across every warm entry inside a bundle.
pub fn bundle_record_count(path: &Path) -> StoreResult<u64> {
    let mut total = 0u64;
    for (name, data) in read_entries(path)? {
        total += count_records_in_bytes(&name, &data)?;
    }
    Ok(total)
}

/// Delete a bundle and prune its year directory if now empty.
/// Returns the bytes freed.
pub fn delete_bundle(bundle: &ColdBundle) -> StoreResult<u64> {
    fs::remove_file(&bundle.path)?;
    if let Some(parent) = bundle.path.parent() {
        crate::layout::prune_empty_dir(parent);
    }
    Ok(bundle.bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::list_cold_bundles;
    use crate::warm::append_batch;
    use chrono::NaiveDate;
    use serde_json::{json, Map, Value};

    fn record(id: i64) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".to_string(), json!(id));
        map
    }

    fn make_warm_file(root: &Path, category: &str, date: NaiveDate, count: i64) -> WarmFile {
        let records: Vec<_> = (0..count).map(record).collect();
        let path = append_batch(root, category, date, &records, true).unwrap();
        WarmFile {
            path,
            date,
            category: category.to_string(),
        }
    }

    #[test]
    fn bundle_holds_dated_entries() {
        let dir = tempfile::tempdir().unwrap();
        let warm = dir.path().join("warm");
        let cold = dir.path().join("cold");
        let date = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let file = make_warm_file(&warm, "events", date, 3);

        let path = write_bundle(&cold, 2026, 7, std::slice::from_ref(&file)).unwrap();
        assert!(path.ends_with("2026/2026-07.tar.gz"));

        let entries = read_entries(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "2026-07-01/events.jsonl.gz");
        assert_eq!(bundle_record_count(&path).unwrap(), 3);
    }

    #[test]
    fn rebundling_merges_without_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let warm = dir.path().join("warm");
        let cold = dir.path().join("cold");
        let d1 = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 7, 15).unwrap();

        let first = make_warm_file(&warm, "events", d1, 2);
        write_bundle(&cold, 2026, 7, std::slice::from_ref(&first)).unwrap();

        // Second pass re-offers the first file plus a new one.
        let second = make_warm_file(&warm, "events", d2, 4);
        let path = write_bundle(&cold, 2026, 7, &[first, second]).unwrap();

        let entries = read_entries(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(bundle_record_count(&path).unwrap(), 6);
    }

    #[test]
    fn multiple_categories_share_a_month_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let warm = dir.path().join("warm");
        let cold = dir.path().join("cold");
        let date = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();

        let events = make_warm_file(&warm, "events", date, 2);
        let logs = make_warm_file(&warm, "logs", date, 5);
        let path = write_bundle(&cold, 2026, 7, &[events, logs]).unwrap();

        assert_eq!(read_entries(&path).unwrap().len(), 2);
        assert_eq!(bundle_record_count(&path).unwrap(), 7);
    }

    #[test]
    fn no_tmp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let warm = dir.path().join("warm");
        let cold = dir.path().join("cold");
        let date = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let file = make_warm_file(&warm, "events", date, 1);

        write_bundle(&cold, 2026, 7, &[file]).unwrap();

        let year_dir: Vec<_> = fs::read_dir(cold.join("2026"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(year_dir, vec!["2026-07.tar.gz".to_string()]);
    }

    #[test]
    fn delete_bundle_prunes_empty_year_dir() {
        let dir = tempfile::tempdir().unwrap();
        let warm = dir.path().join("warm");
        let cold = dir.path().join("cold");
        let date = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let file = make_warm_file(&warm, "events", date, 1);
        write_bundle(&cold, 2026, 7, &[file]).unwrap();

        let bundles = list_cold_bundles(&cold);
        assert_eq!(bundles.len(), 1);
        let freed = delete_bundle(&bundles[0]).unwrap();
        assert!(freed > 0);
        assert!(!cold.join("2026").exists());
    }
}
