use std::collections::HashSet;
use std::sync::Arc;

use backupgate_core::AppResult;
use backupgate_domain::{
    BackupRun, BackupRunId, DeletionResult, InstanceRef, RetentionPolicy,
    select_backups_for_deletion,
};
use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use tracing::{info, warn};

use crate::backup_ports::{AdminResponse, BackupAdminRepository, BackupRunPageQuery};

/// Page size used when listing runs for pruning unless configured otherwise.
pub const DEFAULT_LIST_PAGE_SIZE: u32 = 500;

/// Result of a backup status lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum BackupStatusLookup {
    /// The run record as reported by the admin service.
    Found(AdminResponse<Value>),
    /// `latest` was requested and the instance has no backup runs.
    NoBackups,
}

/// Application service translating backup operations into admin service calls.
#[derive(Clone)]
pub struct BackupService {
    admin: Arc<dyn BackupAdminRepository>,
    list_page_size: u32,
}

impl BackupService {
    /// Creates a service over an admin service adapter.
    #[must_use]
    pub fn new(admin: Arc<dyn BackupAdminRepository>, list_page_size: u32) -> Self {
        Self {
            admin,
            list_page_size: list_page_size.max(1),
        }
    }

    /// Returns the status record of a backup run.
    ///
    /// `backup_id` may be `latest` in any casing, which resolves to the newest
    /// run of the instance.
    pub async fn get_backup_status(
        &self,
        instance: &InstanceRef,
        backup_id: &str,
    ) -> AppResult<BackupStatusLookup> {
        let backup_run_id = if BackupRunId::is_latest_alias(backup_id) {
            info!(
                project_id = instance.project_id(),
                instance_id = instance.instance_id(),
                "resolving latest backup run"
            );
            let page = self
                .admin
                .list_backup_runs(
                    instance,
                    BackupRunPageQuery {
                        max_results: 1,
                        page_token: None,
                    },
                )
                .await?;

            match page.items.into_iter().next() {
                Some(latest) => latest.id().clone(),
                None => return Ok(BackupStatusLookup::NoBackups),
            }
        } else {
            BackupRunId::new(backup_id)?
        };

        info!(
            project_id = instance.project_id(),
            instance_id = instance.instance_id(),
            backup_run_id = %backup_run_id,
            "fetching backup run status"
        );

        self.admin
            .get_backup_run(instance, &backup_run_id)
            .await
            .map(BackupStatusLookup::Found)
    }

    /// Starts a new on-demand backup.
    pub async fn start_on_demand_backup(
        &self,
        instance: &InstanceRef,
    ) -> AppResult<AdminResponse<Value>> {
        info!(
            project_id = instance.project_id(),
            instance_id = instance.instance_id(),
            "starting on-demand backup"
        );

        self.admin.insert_backup_run(instance).await
    }

    /// Deletes the on-demand backups `policy` no longer retains.
    ///
    /// Deletions run concurrently and are awaited. A failed deletion is logged
    /// and does not stop the others; the result lists every selected run.
    pub async fn prune_on_demand_backups(
        &self,
        instance: &InstanceRef,
        policy: RetentionPolicy,
    ) -> AppResult<DeletionResult> {
        if policy.is_disabled() {
            return Ok(DeletionResult::empty(policy));
        }

        let backups = self.list_all_backup_runs(instance).await?;
        let selected = select_backups_for_deletion(&backups, &policy, Utc::now());

        info!(
            project_id = instance.project_id(),
            instance_id = instance.instance_id(),
            listed = backups.len(),
            selected = selected.len(),
            retain_count = policy.count_or_disabled(),
            retain_days = policy.days_or_disabled(),
            "pruning on-demand backups"
        );

        let deletions = selected
            .iter()
            .map(|backup_run_id| self.delete_logged(instance, backup_run_id));
        let failed = join_all(deletions)
            .await
            .into_iter()
            .filter(|succeeded| !succeeded)
            .count();

        if failed > 0 {
            warn!(
                project_id = instance.project_id(),
                instance_id = instance.instance_id(),
                failed,
                "some backup run deletions failed"
            );
        }

        Ok(DeletionResult::new(policy, selected))
    }

    async fn list_all_backup_runs(&self, instance: &InstanceRef) -> AppResult<Vec<BackupRun>> {
        let mut backups = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();

        loop {
            let page = self
                .admin
                .list_backup_runs(
                    instance,
                    BackupRunPageQuery {
                        max_results: self.list_page_size,
                        page_token: page_token.clone(),
                    },
                )
                .await?;
            backups.extend(page.items);

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(next) if seen_tokens.insert(next.clone()) => {
                    page_token = Some(next);
                }
                Some(_) => {
                    warn!(
                        project_id = instance.project_id(),
                        instance_id = instance.instance_id(),
                        "backup run listing repeated its page token, stopping"
                    );
                    break;
                }
                None => break,
            }
        }

        Ok(backups)
    }

    async fn delete_logged(&self, instance: &InstanceRef, backup_run_id: &BackupRunId) -> bool {
        info!(
            project_id = instance.project_id(),
            instance_id = instance.instance_id(),
            backup_run_id = %backup_run_id,
            "deleting backup run"
        );

        match self.admin.delete_backup_run(instance, backup_run_id).await {
            Ok(response) => {
                info!(
                    backup_run_id = %backup_run_id,
                    status = response.status,
                    "backup run deletion accepted"
                );
                true
            }
            Err(error) => {
                warn!(
                    backup_run_id = %backup_run_id,
                    error = %error,
                    "failed to delete backup run"
                );
                false
            }
        }
    }
}
