//! Archiver: hot → warm migration
//!
//! For each category the archiver selects records older than the policy's
//! hot threshold in stable (age, id) order, appends them durably to the
//! day's warm file, and only then deletes exactly those ids from the hot
//! store. A crash between write and delete leaves duplicates in both tiers,
//! never a lost record; an immediate re-run finds the survivors gone and
//! reports `no_records`.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::path::PathBuf;
use tracing::{info, warn};

use permafrost_core::{
    ArchiveReport, CategoryOutcome, CategoryStatus, Cursor, RetentionPolicy, RetentionRegistry,
};
use permafrost_hot::HotStore;
use permafrost_store::ArchiveStore;

use crate::error::EngineResult;

/// Knobs for one archive invocation.
#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    /// Records per write-then-delete batch.
    pub batch_size: usize,
    /// Report what would happen, mutate nothing.
    pub dry_run: bool,
    /// Override the per-policy hot threshold for this invocation only.
    pub older_than_days: Option<u32>,
    /// Gzip warm files.
    pub compress: bool,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            batch_size: 500,
            dry_run: false,
            older_than_days: None,
            compress: true,
        }
    }
}

/// Orchestrates one archive run over the hot store and the archive store.
pub struct Archiver<'a> {
    hot: &'a mut HotStore,
    store: &'a ArchiveStore,
    registry: &'a RetentionRegistry,
    options: ArchiveOptions,
}

impl<'a> Archiver<'a> {
    /// Bind an archiver to its collaborators for one run.
    pub fn new(
        hot: &'a mut HotStore,
        store: &'a ArchiveStore,
        registry: &'a RetentionRegistry,
        options: ArchiveOptions,
    ) -> Self {
        Self {
            hot,
            store,
            registry,
            options,
        }
    }

    /// Archive every category the target resolves to.
    ///
    /// Categories are independent: a failure in one is reported in its
    /// outcome and the run continues with the rest.
    pub fn archive_target(&mut self, target: &str, now: DateTime<Utc>) -> ArchiveReport {
        let policies: Vec<RetentionPolicy> = self
            .registry
            .resolve_target(target)
            .into_iter()
            .cloned()
            .collect();

        let outcomes = if policies.is_empty() {
            vec![CategoryOutcome::empty(target, CategoryStatus::NoPolicy)]
        } else {
            policies
                .iter()
                .map(|policy| self.archive_policy(policy, now))
                .collect()
        };

        ArchiveReport {
            outcomes,
            dry_run: self.options.dry_run,
        }
    }

    /// Archive a single category by name.
    pub fn archive_category(&mut self, category: &str, now: DateTime<Utc>) -> CategoryOutcome {
        match self.registry.policy_for(category) {
            None => CategoryOutcome::empty(category, CategoryStatus::NoPolicy),
            Some(policy) => {
                let policy = policy.clone();
                self.archive_policy(&policy, now)
            }
        }
    }

    fn archive_policy(&mut self, policy: &RetentionPolicy, now: DateTime<Utc>) -> CategoryOutcome {
        let category = policy.category.as_str();
        if policy.exempt {
            return CategoryOutcome::empty(category, CategoryStatus::Exempt);
        }

        let threshold_days = self.options.older_than_days.unwrap_or(policy.hot_days);
        let cutoff = now - Duration::days(i64::from(threshold_days));

        let total = match self
            .hot
            .count_older_than(category, &policy.timestamp_column, cutoff)
        {
            Ok(total) => total,
            Err(e) => return CategoryOutcome::failed(category, e),
        };

        if total == 0 {
            return CategoryOutcome::empty(category, CategoryStatus::NoRecords);
        }

        if self.options.dry_run {
            let mut outcome = CategoryOutcome::empty(category, CategoryStatus::DryRun);
            outcome.records = total;
            return outcome;
        }

        match self.drain_category(policy, cutoff, now) {
            Ok((records, path)) => {
                info!(category, records, "archived category");
                CategoryOutcome {
                    category: category.to_string(),
                    status: CategoryStatus::Archived,
                    records,
                    path,
                    error: None,
                }
            }
            Err(e) => {
                warn!(category, error = %e, "archive run failed; in-flight batch kept hot");
                CategoryOutcome::failed(category, e)
            }
        }
    }

    /// Batch loop for one category. On any error the current batch has not
    /// been deleted from the hot store; batches archived earlier in the
    /// loop stay valid.
    fn drain_category(
        &mut self,
        policy: &RetentionPolicy,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> EngineResult<(u64, Option<PathBuf>)> {
        let category = policy.category.as_str();
        let date = now.date_naive();
        let archived_at = now.to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut cursor: Option<Cursor> = None;
        let mut archived = 0u64;
        let mut path = None;

        loop {
            let batch = self.hot.select_batch(
                category,
                &policy.timestamp_column,
                cutoff,
                self.options.batch_size,
                cursor.as_ref(),
            )?;
            if batch.is_empty() {
                break;
            }
            let last_batch = batch.len() < self.options.batch_size;
            cursor = batch.last().map(Cursor::after);

            let mut lines = Vec::with_capacity(batch.len());
            let mut ids = Vec::with_capacity(batch.len());
            for record in &batch {
                let fields = record.archived_fields(&archived_at);
                // A record that cannot be serialized is skipped and stays
                // in the hot store; one bad row must not sink the batch.
                match serde_json::to_value(&fields) {
                    Ok(serde_json::Value::Object(map)) => {
                        lines.push(map);
                        ids.push(record.id);
                    }
                    Ok(_) | Err(_) => {
                        warn!(category, id = record.id, "skipping unserializable record");
                    }
                }
            }

            if !lines.is_empty() {
                // Durable write first; delete only the ids that were written.
                let written =
                    self.store
                        .append_batch(category, date, &lines, self.options.compress)?;
                self.hot.delete_ids(category, &ids)?;
                archived += ids.len() as u64;
                path = Some(written);
            }

            if last_batch {
                break;
            }
        }

        Ok((archived, path))
    }
}
