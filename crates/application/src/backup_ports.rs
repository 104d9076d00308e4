use async_trait::async_trait;
use backupgate_core::{AccessToken, AppResult};
use backupgate_domain::{BackupRun, BackupRunId, InstanceRef};
use serde_json::Value;

/// Payload returned by the backup admin service along with its HTTP status.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminResponse<T> {
    /// HTTP status code the admin service answered with.
    pub status: u16,
    /// Decoded response body.
    pub body: T,
}

impl<T> AdminResponse<T> {
    /// Creates a response wrapper.
    #[must_use]
    pub fn new(status: u16, body: T) -> Self {
        Self { status, body }
    }
}

/// One page request against the backup run listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRunPageQuery {
    /// Maximum number of runs returned in the page.
    pub max_results: u32,
    /// Continuation token from the previous page.
    pub page_token: Option<String>,
}

/// One page of backup runs, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupRunPage {
    /// Runs on this page.
    pub items: Vec<BackupRun>,
    /// Token for the next page, absent on the last one.
    pub next_page_token: Option<String>,
}

/// Port for the external database backup administration service.
#[async_trait]
pub trait BackupAdminRepository: Send + Sync {
    /// Lists backup runs for an instance, newest first.
    async fn list_backup_runs(
        &self,
        instance: &InstanceRef,
        query: BackupRunPageQuery,
    ) -> AppResult<BackupRunPage>;

    /// Returns the full record of one backup run.
    async fn get_backup_run(
        &self,
        instance: &InstanceRef,
        backup_run_id: &BackupRunId,
    ) -> AppResult<AdminResponse<Value>>;

    /// Starts a new on-demand backup and returns the resulting operation.
    async fn insert_backup_run(&self, instance: &InstanceRef) -> AppResult<AdminResponse<Value>>;

    /// Deletes one backup run and returns the resulting operation.
    async fn delete_backup_run(
        &self,
        instance: &InstanceRef,
        backup_run_id: &BackupRunId,
    ) -> AppResult<AdminResponse<Value>>;
}

/// Port supplying bearer credentials for the backup admin service.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Returns a token valid for at least the next request.
    async fn access_token(&self) -> AppResult<AccessToken>;
}
