//! Purger: permanent deletion of expired cold bundles
//!
//! A bundle may hold every category archived in its month, so the purge
//! decision uses the maximum cold threshold across all configured policies:
//! no record is deleted before the longest-lived category in the registry
//! would allow. Age is measured from the last day of the bundle's month,
//! the youngest date its contents can carry.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use permafrost_core::{PurgeReport, PurgedBundle, RetentionRegistry};
use permafrost_store::ArchiveStore;

/// Delete (or report, for dry-run) cold bundles past the retention horizon.
pub fn purge(
    store: &ArchiveStore,
    registry: &RetentionRegistry,
    dry_run: bool,
    now: DateTime<Utc>,
) -> PurgeReport {
    let mut report = PurgeReport {
        purged: Vec::new(),
        bytes_freed: 0,
        errors: Vec::new(),
        dry_run,
    };

    // No archivable policies means no defensible horizon; purge nothing.
    let Some(max_days) = registry.max_cold_threshold() else {
        return report;
    };
    let today = now.date_naive();

    for bundle in store.list_bundles() {
        let Some(month_end) = last_day_of_month(bundle.year, bundle.month) else {
            warn!(path = %bundle.path.display(), "unparseable bundle month, skipping");
            continue;
        };
        let age_days = (today - month_end).num_days();
        if age_days <= i64::from(max_days) {
            continue;
        }

        let purged = PurgedBundle {
            year: bundle.year,
            month: bundle.month,
            path: bundle.path.clone(),
            bytes: bundle.bytes,
        };

        if dry_run {
            report.bytes_freed += purged.bytes;
            report.purged.push(purged);
            continue;
        }

        match store.delete_bundle(&bundle) {
            Ok(bytes) => {
                info!(year = bundle.year, month = bundle.month, bytes, "purged bundle");
                report.bytes_freed += bytes;
                report.purged.push(purged);
            }
            Err(e) => {
                warn!(path = %bundle.path.display(), error = %e, "failed to purge bundle");
                report
                    .errors
                    .push(format!("{}: {e}", bundle.path.display()));
            }
        }
    }

    report
}

/// Last calendar day of (year, month).
fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    next_month.pred_opt().filter(|d| *d >= first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use permafrost_core::RetentionPolicy;
    use permafrost_store::WarmFile;
    use serde_json::{json, Map, Value};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 23, 12, 0, 0).unwrap()
    }

    fn short_registry(cold_days: u32) -> RetentionRegistry {
        RetentionRegistry::from_policies(vec![RetentionPolicy {
            category: "events".to_string(),
            hot_days: 7,
            warm_days: 21,
            cold_days,
            timestamp_column: "created_at".to_string(),
            exempt: false,
            class: None,
        }])
        .unwrap()
    }

    fn seed_bundle(store: &ArchiveStore, year: i32, month: u32) {
        let date = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
        let mut map = Map::new();
        map.insert("id".to_string(), json!(1));
        let path = store
            .append_batch("events", date, &[map], true)
            .unwrap();
        let file = WarmFile {
            path,
            date,
            category: "events".to_string(),
        };
        store.write_bundle(year, month, &[file.clone()]).unwrap();
        store.remove_warm_files(&[file]).unwrap();
    }

    #[test]
    fn month_end_calculation() {
        assert_eq!(
            last_day_of_month(2026, 2),
            NaiveDate::from_ymd_opt(2026, 2, 28)
        );
        assert_eq!(
            last_day_of_month(2024, 2),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(
            last_day_of_month(2026, 12),
            NaiveDate::from_ymd_opt(2026, 12, 31)
        );
        assert_eq!(last_day_of_month(2026, 13), None);
    }

    #[test]
    fn purges_only_past_the_max_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(dir.path());
        // hot 7 + warm 21 + cold 30 = 58 day horizon from now() = 2026-08-23.
        let registry = short_registry(30);
        seed_bundle(&store, 2026, 5); // May ends 2026-05-31: 84 days old
        seed_bundle(&store, 2026, 7); // July ends 2026-07-31: 23 days old

        let report = purge(&store, &registry, false, now());

        assert_eq!(report.purged.len(), 1);
        assert_eq!((report.purged[0].year, report.purged[0].month), (2026, 5));
        assert!(report.bytes_freed > 0);

        let remaining = store.list_bundles();
        assert_eq!(remaining.len(), 1);
        assert_eq!((remaining[0].year, remaining[0].month), (2026, 7));
    }

    #[test]
    fn dry_run_deletes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(dir.path());
        let registry = short_registry(0);
        seed_bundle(&store, 2026, 1);

        let report = purge(&store, &registry, true, now());

        assert_eq!(report.purged.len(), 1);
        assert!(report.bytes_freed > 0);
        assert_eq!(store.list_bundles().len(), 1);
    }

    #[test]
    fn zero_cold_days_purges_after_warm_horizon() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(dir.path());
        // Horizon = 7 + 21 + 0 = 28 days.
        let registry = short_registry(0);
        seed_bundle(&store, 2026, 6); // June ends 2026-06-30: 54 days old
        seed_bundle(&store, 2026, 8); // current month

        let report = purge(&store, &registry, false, now());

        assert_eq!(report.purged.len(), 1);
        assert_eq!(report.purged[0].month, 6);
    }

    #[test]
    fn empty_registry_never_purges() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(dir.path());
        seed_bundle(&store, 2020, 1);
        let registry = RetentionRegistry::from_policies(vec![]).unwrap();

        let report = purge(&store, &registry, false, now());
        assert!(report.purged.is_empty());
        assert_eq!(store.list_bundles().len(), 1);
    }
}
