//! Backup run snapshots as reported by the database admin service.

use std::str::FromStr;

use backupgate_core::{AppError, AppResult, NonEmptyString};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Literal accepted in place of a backup run id to address the newest run.
pub const LATEST_BACKUP_ALIAS: &str = "latest";

/// Project and database instance a backup operation targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceRef {
    project_id: NonEmptyString,
    instance_id: NonEmptyString,
}

impl InstanceRef {
    /// Creates a validated instance reference.
    pub fn new(project_id: impl Into<String>, instance_id: impl Into<String>) -> AppResult<Self> {
        let project_id = NonEmptyString::new(project_id)
            .map_err(|_| AppError::Validation("project id must not be empty".to_owned()))?;
        let instance_id = NonEmptyString::new(instance_id)
            .map_err(|_| AppError::Validation("instance id must not be empty".to_owned()))?;

        Ok(Self {
            project_id,
            instance_id,
        })
    }

    /// Returns the cloud project id.
    #[must_use]
    pub fn project_id(&self) -> &str {
        self.project_id.as_str()
    }

    /// Returns the database instance id.
    #[must_use]
    pub fn instance_id(&self) -> &str {
        self.instance_id.as_str()
    }
}

/// Opaque backup run identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackupRunId(String);

impl BackupRunId {
    /// Creates a validated backup run identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "backup run id must not be empty".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the identifier as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns whether `value` names the newest backup run instead of a concrete id.
    #[must_use]
    pub fn is_latest_alias(value: &str) -> bool {
        value.eq_ignore_ascii_case(LATEST_BACKUP_ALIAS)
    }
}

impl std::fmt::Display for BackupRunId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Backup run origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupRunType {
    /// Triggered by an explicit request. Only these participate in retention.
    OnDemand,
    /// Taken by the instance's automated backup schedule.
    Automated,
    /// Any type this service does not know about.
    Other(String),
}

impl BackupRunType {
    /// Returns the admin service's wire value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::OnDemand => "ON_DEMAND",
            Self::Automated => "AUTOMATED",
            Self::Other(value) => value.as_str(),
        }
    }
}

impl FromStr for BackupRunType {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "ON_DEMAND" => Self::OnDemand,
            "AUTOMATED" => Self::Automated,
            other => Self::Other(other.to_owned()),
        })
    }
}

/// Immutable snapshot of one backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRun {
    id: BackupRunId,
    run_type: BackupRunType,
    status: Option<String>,
    end_time: Option<DateTime<Utc>>,
}

impl BackupRun {
    /// Creates a backup run snapshot.
    #[must_use]
    pub fn new(
        id: BackupRunId,
        run_type: BackupRunType,
        status: Option<String>,
        end_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            run_type,
            status,
            end_time,
        }
    }

    /// Returns the run identifier.
    #[must_use]
    pub fn id(&self) -> &BackupRunId {
        &self.id
    }

    /// Returns the run type.
    #[must_use]
    pub fn run_type(&self) -> &BackupRunType {
        &self.run_type
    }

    /// Returns the admin service's status label, e.g. `SUCCESSFUL`.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Returns when the run completed. Runs still in progress have none.
    #[must_use]
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Returns whether this run was requested on demand.
    #[must_use]
    pub fn is_on_demand(&self) -> bool {
        self.run_type == BackupRunType::OnDemand
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_alias_is_case_insensitive() {
        assert!(BackupRunId::is_latest_alias("latest"));
        assert!(BackupRunId::is_latest_alias("LaTeSt"));
        assert!(!BackupRunId::is_latest_alias("1600000000000"));
    }

    #[test]
    fn unknown_run_type_is_preserved() {
        let parsed = "SNAPSHOT".parse::<BackupRunType>();
        assert_eq!(
            parsed.unwrap_or(BackupRunType::OnDemand),
            BackupRunType::Other("SNAPSHOT".to_owned())
        );
    }

    #[test]
    fn instance_ref_rejects_blank_ids() {
        assert!(InstanceRef::new("", "db").is_err());
        assert!(InstanceRef::new("project", "  ").is_err());
        assert!(InstanceRef::new("project", "db").is_ok());
    }
}
