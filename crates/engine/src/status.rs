//! Retention status: per-category usage across tiers

use permafrost_core::{CategoryUsage, RetentionRegistry, StatusReport, TierUsage};
use permafrost_hot::HotStore;
use permafrost_store::ArchiveStore;

use crate::error::EngineResult;

/// Snapshot hot/warm/cold usage for every configured category.
pub fn retention_status(
    hot: &HotStore,
    store: &ArchiveStore,
    registry: &RetentionRegistry,
) -> EngineResult<StatusReport> {
    let stats = store.stats();

    let mut categories = Vec::new();
    for policy in registry.all() {
        let hot_rows = hot.count_rows(&policy.category)?;
        let warm = stats
            .per_category
            .get(&policy.category)
            .copied()
            .unwrap_or_default();
        categories.push(CategoryUsage {
            category: policy.category.clone(),
            hot_rows,
            warm_files: warm.files,
            warm_bytes: warm.bytes,
        });
    }

    Ok(StatusReport {
        categories,
        warm: TierUsage {
            files: stats.file_count,
            bytes: stats.total_bytes,
        },
        cold: TierUsage {
            files: stats.bundle_count,
            bytes: stats.bundle_bytes,
        },
    })
}
