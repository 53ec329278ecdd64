//! Consolidator: warm → cold migration
//!
//! Groups aged warm files by calendar month and folds each group into the
//! month's cold bundle. The same write-before-delete discipline as the
//! archiver applies: a month's warm files are removed only after its bundle
//! has been written and renamed into place, and one month's failure leaves
//! every other month untouched.

use chrono::{DateTime, Datelike, Days, Utc};
use std::collections::BTreeMap;
use tracing::{info, warn};

use permafrost_core::{BundleOutcome, ConsolidateReport};
use permafrost_store::{ArchiveStore, WarmFile};

/// Consolidate warm files older than `older_than_days` into monthly bundles.
pub fn consolidate(
    store: &ArchiveStore,
    older_than_days: u32,
    dry_run: bool,
    now: DateTime<Utc>,
) -> ConsolidateReport {
    let threshold = now
        .date_naive()
        .checked_sub_days(Days::new(u64::from(older_than_days)))
        .unwrap_or(now.date_naive());

    let mut months: BTreeMap<(i32, u32), Vec<WarmFile>> = BTreeMap::new();
    for file in store.list_warm(None, None) {
        if file.date < threshold {
            months
                .entry((file.date.year(), file.date.month()))
                .or_default()
                .push(file);
        }
    }

    let mut report = ConsolidateReport {
        bundles: Vec::new(),
        files_consolidated: 0,
        records: 0,
        dry_run,
    };

    for ((year, month), files) in months {
        let records = files
            .iter()
            .map(|f| warm_record_count(store, f))
            .sum::<u64>();
        let mut outcome = BundleOutcome {
            year,
            month,
            path: store.bundle_target(year, month),
            files: files.len() as u64,
            records,
            error: None,
        };

        if dry_run {
            report.files_consolidated += outcome.files;
            report.records += outcome.records;
            report.bundles.push(outcome);
            continue;
        }

        match store.write_bundle(year, month, &files) {
            Ok(path) => {
                outcome.path = path;
                // Bundle is durable; now the warm copies may go.
                if let Err(e) = store.remove_warm_files(&files) {
                    // Duplicates in warm and cold, never a loss. The next
                    // consolidation pass skips already-bundled entries.
                    warn!(year, month, error = %e, "bundle written but warm cleanup failed");
                    outcome.error = Some(format!("warm cleanup failed: {e}"));
                } else {
                    report.files_consolidated += outcome.files;
                    report.records += outcome.records;
                }
                info!(year, month, files = outcome.files, "consolidated month");
            }
            Err(e) => {
                warn!(year, month, error = %e, "bundle write failed; warm files kept");
                outcome.error = Some(e.to_string());
            }
        }
        report.bundles.push(outcome);
    }

    report
}

/// Records in one warm file; unreadable files count their readable prefix.
fn warm_record_count(store: &ArchiveStore, file: &WarmFile) -> u64 {
    match store.read_warm(&file.path) {
        Ok(reader) => reader.filter(|r| r.is_ok()).count() as u64,
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use serde_json::{json, Map, Value};

    fn record(id: i64) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".to_string(), json!(id));
        map
    }

    fn seed_warm(store: &ArchiveStore, category: &str, date: NaiveDate, count: i64) {
        let records: Vec<_> = (0..count).map(record).collect();
        store.append_batch(category, date, &records, true).unwrap();
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 23, 12, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn consolidates_only_aged_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(dir.path());
        seed_warm(&store, "events", date(2026, 7, 9), 10); // 45 days old
        seed_warm(&store, "events", date(2026, 8, 18), 1); // 5 days old

        let report = consolidate(&store, 30, false, now());

        assert_eq!(report.bundles.len(), 1);
        assert_eq!(report.files_consolidated, 1);
        assert_eq!(report.records, 10);

        // Old directory gone, young file untouched.
        assert!(!dir.path().join("warm/2026-07-09").exists());
        assert_eq!(store.list_warm(None, None).len(), 1);

        let bundles = store.list_bundles();
        assert_eq!(bundles.len(), 1);
        assert_eq!((bundles[0].year, bundles[0].month), (2026, 7));
        assert_eq!(store.bundle_record_count(&bundles[0].path).unwrap(), 10);
    }

    #[test]
    fn record_counts_are_conserved_across_months() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(dir.path());
        seed_warm(&store, "events", date(2026, 6, 1), 4);
        seed_warm(&store, "logs", date(2026, 6, 2), 6);
        seed_warm(&store, "events", date(2026, 7, 1), 5);

        let warm_before = store.list_warm(None, None).len();
        let report = consolidate(&store, 30, false, now());

        assert_eq!(report.bundles.len(), 2);
        assert_eq!(report.records, 15);
        assert!(store.list_warm(None, None).len() < warm_before);

        let total: u64 = store
            .list_bundles()
            .iter()
            .map(|b| store.bundle_record_count(&b.path).unwrap())
            .sum();
        assert_eq!(total, 15);
    }

    #[test]
    fn dry_run_reports_without_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(dir.path());
        seed_warm(&store, "events", date(2026, 7, 9), 10);

        let report = consolidate(&store, 30, true, now());

        assert!(report.dry_run);
        assert_eq!(report.files_consolidated, 1);
        assert_eq!(report.records, 10);
        assert_eq!(store.list_warm(None, None).len(), 1);
        assert!(store.list_bundles().is_empty());
    }

    #[test]
    fn nothing_eligible_is_an_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(dir.path());
        seed_warm(&store, "events", date(2026, 8, 20), 3);

        let report = consolidate(&store, 30, false, now());
        assert!(report.bundles.is_empty());
        assert!(!report.is_failure());
    }

    #[test]
    fn rerun_after_consolidation_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(dir.path());
        seed_warm(&store, "events", date(2026, 7, 9), 10);

        consolidate(&store, 30, false, now());
        let report = consolidate(&store, 30, false, now());

        assert!(report.bundles.is_empty());
        assert_eq!(store.list_bundles().len(), 1);
        assert_eq!(
            store
                .bundle_record_count(&store.list_bundles()[0].path)
                .unwrap(),
            10
        );
    }
}
