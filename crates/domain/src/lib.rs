//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod backup;
mod retention;

pub use backup::{BackupRun, BackupRunId, BackupRunType, InstanceRef, LATEST_BACKUP_ALIAS};
pub use retention::{
    DeletionResult, RETENTION_RULE_DISABLED, RetentionPolicy, select_backups_for_deletion,
};
