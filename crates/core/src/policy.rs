//! Retention policies and the category registry
//!
//! Each data category owns one [`RetentionPolicy`] describing how long its
//! records live in every tier and which column measures their age. Per-category
//! behavior is data, not branching: the engine looks categories up in a
//! [`RetentionRegistry`] and treats every entry the same way.
//!
//! Thresholds are cumulative day counts from record age zero:
//!
//! ```text
//! age 0 ........ hot_days ........ hot_days+warm_days ........ +cold_days
//!   |   hot tier    |      warm tier      |       cold tier       | gone
//! ```
//!
//! The registry is immutable after construction; a run never observes a
//! policy change mid-flight.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building a registry from configuration.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Two policies claim the same category name.
    #[error("duplicate policy for category '{0}'")]
    DuplicateCategory(String),

    /// The config file could not be opened or read.
    #[error("failed to read policy config: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid policy JSON.
    #[error("failed to parse policy config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Retention policy for one data category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Category name; doubles as the hot-store table name.
    pub category: String,
    /// Days a record stays in the hot store.
    pub hot_days: u32,
    /// Additional days in the warm tier after leaving hot.
    pub warm_days: u32,
    /// Additional days in the cold tier; 0 means delete at end of warm.
    pub cold_days: u32,
    /// Column holding the RFC-3339 timestamp used for age comparisons.
    pub timestamp_column: String,
    /// Exempt categories are never archived or purged.
    #[serde(default)]
    pub exempt: bool,
    /// Optional group name so the CLI can target several categories at once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

impl RetentionPolicy {
    /// Age in days past which a record should have left the warm tier.
    pub fn warm_threshold(&self) -> u32 {
        self.hot_days + self.warm_days
    }

    /// Age in days past which a record may be deleted entirely.
    ///
    /// Equals `warm_threshold()` when `cold_days` is zero.
    pub fn cold_threshold(&self) -> u32 {
        self.hot_days + self.warm_days + self.cold_days
    }
}

/// Shape of a policy config file: `{"policies": [ ... ]}`.
#[derive(Debug, Deserialize)]
struct PolicyConfig {
    policies: Vec<RetentionPolicy>,
}

/// Immutable category → policy lookup table.
///
/// Built once at process start from the built-in defaults or a config
/// file, then shared read-only with the archiver and cleanup passes.
#[derive(Debug, Clone)]
pub struct RetentionRegistry {
    policies: BTreeMap<String, RetentionPolicy>,
}

impl RetentionRegistry {
    /// Default policy table for the agent observability schema.
    pub fn builtin() -> Self {
        let telemetry = Some("telemetry".to_string());
        let policies = vec![
            RetentionPolicy {
                category: "events".to_string(),
                hot_days: 7,
                warm_days: 30,
                cold_days: 180,
                timestamp_column: "created_at".to_string(),
                exempt: false,
                class: telemetry.clone(),
            },
            RetentionPolicy {
                category: "tool_calls".to_string(),
                hot_days: 7,
                warm_days: 30,
                cold_days: 180,
                timestamp_column: "started_at".to_string(),
                exempt: false,
                class: telemetry.clone(),
            },
            RetentionPolicy {
                category: "metrics".to_string(),
                hot_days: 3,
                warm_days: 14,
                cold_days: 90,
                timestamp_column: "recorded_at".to_string(),
                exempt: false,
                class: telemetry.clone(),
            },
            RetentionPolicy {
                category: "logs".to_string(),
                hot_days: 7,
                warm_days: 21,
                cold_days: 0,
                timestamp_column: "created_at".to_string(),
                exempt: false,
                class: telemetry,
            },
            // Session rows are referenced by live queries indefinitely.
            RetentionPolicy {
                category: "sessions".to_string(),
                hot_days: 0,
                warm_days: 0,
                cold_days: 0,
                timestamp_column: "started_at".to_string(),
                exempt: true,
                class: None,
            },
        ];
        // Builtin names are distinct by construction.
        Self::from_policies(policies).unwrap_or_else(|_| Self {
            policies: BTreeMap::new(),
        })
    }

    /// Build a registry from an explicit policy list.
    pub fn from_policies(policies: Vec<RetentionPolicy>) -> Result<Self, PolicyError> {
        let mut map = BTreeMap::new();
        for policy in policies {
            let name = policy.category.clone();
            if map.insert(name.clone(), policy).is_some() {
                return Err(PolicyError::DuplicateCategory(name));
            }
        }
        Ok(Self { policies: map })
    }

    /// Load a registry from a JSON config file, replacing the builtins.
    pub fn from_config_file(path: &Path) -> Result<Self, PolicyError> {
        let file = File::open(path)?;
        let config: PolicyConfig = serde_json::from_reader(BufReader::new(file))?;
        Self::from_policies(config.policies)
    }

    /// Look up the policy for a category, if one is configured.
    pub fn policy_for(&self, category: &str) -> Option<&RetentionPolicy> {
        self.policies.get(category)
    }

    /// Whether a category exists and is marked exempt.
    pub fn is_exempt(&self, category: &str) -> bool {
        self.policy_for(category).is_some_and(|p| p.exempt)
    }

    /// All configured policies in category order.
    pub fn all(&self) -> impl Iterator<Item = &RetentionPolicy> {
        self.policies.values()
    }

    /// Resolve a CLI target into the policies it names.
    ///
    /// `all` selects every policy; a class name selects its members; anything
    /// else selects the single category with that name. Unknown targets
    /// resolve to an empty list; the caller reports `no_policy` rather than
    /// erroring.
    pub fn resolve_target(&self, target: &str) -> Vec<&RetentionPolicy> {
        if target == "all" {
            return self.all().collect();
        }
        let class_members: Vec<&RetentionPolicy> = self
            .all()
            .filter(|p| p.class.as_deref() == Some(target))
            .collect();
        if !class_members.is_empty() {
            return class_members;
        }
        self.policy_for(target).into_iter().collect()
    }

    /// Maximum cold threshold across non-exempt policies.
    ///
    /// Cold bundles mix categories by month, so the purger must wait for
    /// the longest-lived category before deleting a bundle. `None` when no
    /// archivable policy exists (purge then deletes nothing).
    pub fn max_cold_threshold(&self) -> Option<u32> {
        self.all()
            .filter(|p| !p.exempt)
            .map(|p| p.cold_threshold())
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn policy(category: &str, hot: u32, warm: u32, cold: u32) -> RetentionPolicy {
        RetentionPolicy {
            category: category.to_string(),
            hot_days: hot,
            warm_days: warm,
            cold_days: cold,
            timestamp_column: "created_at".to_string(),
            exempt: false,
            class: None,
        }
    }

    #[test]
    fn thresholds_are_cumulative() {
        let p = policy("events", 7, 30, 180);
        assert_eq!(p.warm_threshold(), 37);
        assert_eq!(p.cold_threshold(), 217);
    }

    #[test]
    fn zero_cold_days_collapses_thresholds() {
        let p = policy("logs", 7, 21, 0);
        assert_eq!(p.warm_threshold(), p.cold_threshold());
    }

    #[test]
    fn builtin_has_expected_categories() {
        let registry = RetentionRegistry::builtin();
        assert!(registry.policy_for("events").is_some());
        assert!(registry.policy_for("logs").is_some());
        assert!(registry.is_exempt("sessions"));
        assert!(!registry.is_exempt("events"));
        assert!(!registry.is_exempt("nonexistent"));
    }

    #[test]
    fn duplicate_category_rejected() {
        let result =
            RetentionRegistry::from_policies(vec![policy("a", 1, 1, 1), policy("a", 2, 2, 2)]);
        assert!(matches!(result, Err(PolicyError::DuplicateCategory(_))));
    }

    #[test]
    fn resolve_target_all_and_class() {
        let registry = RetentionRegistry::builtin();
        let all = registry.resolve_target("all");
        assert_eq!(all.len(), 5);

        let telemetry = registry.resolve_target("telemetry");
        assert_eq!(telemetry.len(), 4);
        assert!(telemetry.iter().all(|p| p.class.as_deref() == Some("telemetry")));

        let single = registry.resolve_target("events");
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].category, "events");

        assert!(registry.resolve_target("no_such_thing").is_empty());
    }

    #[test]
    fn max_cold_threshold_ignores_exempt() {
        let registry = RetentionRegistry::builtin();
        // events/tool_calls: 7+30+180 = 217 is the longest horizon.
        assert_eq!(registry.max_cold_threshold(), Some(217));
    }

    #[test]
    fn config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policies.json");
        let mut file = File::create(&path).unwrap();
        write!(
            file,
            r#"{{"policies": [
                {{"category": "events", "hot_days": 1, "warm_days": 2,
                  "cold_days": 3, "timestamp_column": "ts"}}
            ]}}"#
        )
        .unwrap();

        let registry = RetentionRegistry::from_config_file(&path).unwrap();
        let p = registry.policy_for("events").unwrap();
        assert_eq!(p.hot_days, 1);
        assert_eq!(p.timestamp_column, "ts");
        assert!(!p.exempt);
        assert!(registry.policy_for("logs").is_none());
    }
}
