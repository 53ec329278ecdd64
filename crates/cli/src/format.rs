//! Report rendering: human-readable or JSON
//!
//! The JSON form is the serde encoding of the same report the human form
//! prints; the two never disagree on a field.

use permafrost::{
    ArchiveReport, CategoryStatus, CleanupReport, RetentionPolicy, StatusReport,
};

/// How reports are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Aligned human-readable lines.
    Human,
    /// One JSON document on stdout.
    Json,
}

/// Render an archive report.
pub fn format_archive(report: &ArchiveReport, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => to_json(report),
        OutputMode::Human => {
            let mut out = Vec::new();
            for outcome in &report.outcomes {
                let status = status_label(outcome.status);
                let mut line = format!("{:<12} {:<11} {:>8}", outcome.category, status, outcome.records);
                if let Some(path) = &outcome.path {
                    line.push_str(&format!("  {}", path.display()));
                }
                if let Some(error) = &outcome.error {
                    line.push_str(&format!("  ({error})"));
                }
                out.push(line);
            }
            out.push(format!(
                "{} record(s) {}",
                report.total_records(),
                if report.dry_run { "would be archived (dry-run)" } else { "archived" }
            ));
            out.join("\n")
        }
    }
}

/// Render a cleanup report.
pub fn format_cleanup(report: &CleanupReport, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => to_json(report),
        OutputMode::Human => {
            let suffix = if report.dry_run { " (dry-run)" } else { "" };
            let mut out = Vec::new();
            if let Some(consolidate) = &report.consolidate {
                for bundle in &consolidate.bundles {
                    let mut line = format!(
                        "bundle {:04}-{:02}: {} file(s), {} record(s) -> {}",
                        bundle.year,
                        bundle.month,
                        bundle.files,
                        bundle.records,
                        bundle.path.display()
                    );
                    if let Some(error) = &bundle.error {
                        line.push_str(&format!("  FAILED: {error}"));
                    }
                    out.push(line);
                }
                out.push(format!(
                    "consolidated {} warm file(s), {} record(s){suffix}",
                    consolidate.files_consolidated, consolidate.records
                ));
            }
            if let Some(purge) = &report.purge {
                for bundle in &purge.purged {
                    out.push(format!(
                        "purge {:04}-{:02}: {} ({})",
                        bundle.year,
                        bundle.month,
                        bundle.path.display(),
                        human_bytes(bundle.bytes)
                    ));
                }
                for error in &purge.errors {
                    out.push(format!("purge FAILED: {error}"));
                }
                out.push(format!(
                    "purged {} bundle(s), {} freed{suffix}",
                    purge.purged.len(),
                    human_bytes(purge.bytes_freed)
                ));
            }
            out.join("\n")
        }
    }
}

/// Render a retention status report.
pub fn format_status(report: &StatusReport, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => to_json(report),
        OutputMode::Human => {
            let mut out = vec![format!(
                "{:<12} {:>10} {:>12} {:>12}",
                "category", "hot rows", "warm files", "warm size"
            )];
            for usage in &report.categories {
                out.push(format!(
                    "{:<12} {:>10} {:>12} {:>12}",
                    usage.category,
                    usage.hot_rows,
                    usage.warm_files,
                    human_bytes(usage.warm_bytes)
                ));
            }
            out.push(format!(
                "warm total: {} file(s), {}",
                report.warm.files,
                human_bytes(report.warm.bytes)
            ));
            out.push(format!(
                "cold total: {} bundle(s), {}",
                report.cold.files,
                human_bytes(report.cold.bytes)
            ));
            out.join("\n")
        }
    }
}

/// Render the configured policy table.
pub fn format_policies(policies: &[&RetentionPolicy], mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => to_json(&policies),
        OutputMode::Human => {
            let mut out = vec![format!(
                "{:<12} {:>5} {:>6} {:>6}  {:<12} {}",
                "category", "hot", "warm", "cold", "age column", "flags"
            )];
            for policy in policies {
                let mut flags = Vec::new();
                if policy.exempt {
                    flags.push("exempt".to_string());
                }
                if let Some(class) = &policy.class {
                    flags.push(format!("class={class}"));
                }
                out.push(format!(
                    "{:<12} {:>4}d {:>5}d {:>5}d  {:<12} {}",
                    policy.category,
                    policy.hot_days,
                    policy.warm_days,
                    policy.cold_days,
                    policy.timestamp_column,
                    flags.join(",")
                ));
            }
            out.join("\n")
        }
    }
}

fn status_label(status: CategoryStatus) -> &'static str {
    match status {
        CategoryStatus::Archived => "archived",
        CategoryStatus::NoRecords => "no_records",
        CategoryStatus::Exempt => "exempt",
        CategoryStatus::NoPolicy => "no_policy",
        CategoryStatus::DryRun => "dry_run",
        CategoryStatus::Failed => "failed",
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
