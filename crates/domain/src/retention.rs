//! Retention rules for on-demand backups.
//!
//! Two independent rules decide which on-demand runs are pruned: a count rule
//! that keeps the newest `count` runs and an age rule that drops runs which
//! finished more than `days` days ago. A run picked by either rule is deleted
//! once.

use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, Utc};

use crate::backup::{BackupRun, BackupRunId};

/// Wire value for a disabled retention rule.
pub const RETENTION_RULE_DISABLED: i64 = -1;

/// Count and age retention limits. `None` disables a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    count: Option<u32>,
    days: Option<u32>,
}

impl RetentionPolicy {
    /// Creates a policy from optional limits.
    #[must_use]
    pub fn new(count: Option<u32>, days: Option<u32>) -> Self {
        Self { count, days }
    }

    /// Creates a policy from signed limits where any negative value disables the rule.
    ///
    /// Values beyond `u32::MAX` saturate, which keeps every run for that rule.
    #[must_use]
    pub fn from_signed(count: i64, days: i64) -> Self {
        Self {
            count: non_negative(count),
            days: non_negative(days),
        }
    }

    /// Number of newest on-demand runs to keep.
    #[must_use]
    pub fn count(&self) -> Option<u32> {
        self.count
    }

    /// Age in days beyond which on-demand runs are dropped.
    #[must_use]
    pub fn days(&self) -> Option<u32> {
        self.days
    }

    /// Count limit with `-1` standing in for a disabled rule.
    #[must_use]
    pub fn count_or_disabled(&self) -> i64 {
        self.count.map_or(RETENTION_RULE_DISABLED, i64::from)
    }

    /// Day limit with `-1` standing in for a disabled rule.
    #[must_use]
    pub fn days_or_disabled(&self) -> i64 {
        self.days.map_or(RETENTION_RULE_DISABLED, i64::from)
    }

    /// Returns whether neither rule applies.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.count.is_none() && self.days.is_none()
    }
}

fn non_negative(value: i64) -> Option<u32> {
    if value < 0 {
        return None;
    }

    Some(u32::try_from(value).unwrap_or(u32::MAX))
}

/// Outcome of a pruning request: the policy applied and the runs selected for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionResult {
    policy: RetentionPolicy,
    deleted: Vec<BackupRunId>,
}

impl DeletionResult {
    /// Creates a result for the given policy and selected runs.
    #[must_use]
    pub fn new(policy: RetentionPolicy, deleted: Vec<BackupRunId>) -> Self {
        Self { policy, deleted }
    }

    /// Creates a result where nothing was selected.
    #[must_use]
    pub fn empty(policy: RetentionPolicy) -> Self {
        Self::new(policy, Vec::new())
    }

    /// Policy the selection was computed with.
    #[must_use]
    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Selected run identifiers, without duplicates.
    #[must_use]
    pub fn deleted(&self) -> &[BackupRunId] {
        self.deleted.as_slice()
    }

    /// Number of selected runs.
    #[must_use]
    pub fn total(&self) -> usize {
        self.deleted.len()
    }
}

/// Selects the on-demand runs `policy` discards.
///
/// `backups` must be ordered newest first. Non on-demand runs are ignored. Count
/// candidates come first in listing order, followed by runs only the age rule
/// picked.
#[must_use]
pub fn select_backups_for_deletion(
    backups: &[BackupRun],
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> Vec<BackupRunId> {
    let on_demand: Vec<&BackupRun> = backups.iter().filter(|run| run.is_on_demand()).collect();

    let by_count = policy
        .count()
        .and_then(|count| usize::try_from(count).ok())
        .map(|count| on_demand.iter().skip(count).copied().collect::<Vec<_>>())
        .unwrap_or_default();

    let by_age = policy
        .days()
        .map(|days| match age_cutoff(now, days) {
            Some(cutoff) => on_demand
                .iter()
                .filter(|run| run.end_time().is_some_and(|end_time| end_time < cutoff))
                .copied()
                .collect::<Vec<_>>(),
            None => Vec::new(),
        })
        .unwrap_or_default();

    let mut seen = HashSet::new();
    by_count
        .into_iter()
        .chain(by_age)
        .filter(|run| seen.insert(run.id()))
        .map(|run| run.id().clone())
        .collect()
}

fn age_cutoff(now: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    TimeDelta::try_days(i64::from(days)).and_then(|age| now.checked_sub_signed(age))
}
