use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use backupgate_application::{
    AdminResponse, BackupAdminRepository, BackupRunPage, BackupRunPageQuery,
};
use backupgate_core::{AppError, AppResult};
use backupgate_domain::{BackupRun, BackupRunId, BackupRunType, InstanceRef};
use chrono::Utc;
use serde_json::{Value, json};
use tokio::sync::RwLock;

use crate::cloudsql_wire::BackupRunWire;

/// Admin call observed by [`InMemoryBackupAdmin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupAdminCall {
    /// Listing with the requested page size and token.
    List(BackupRunPageQuery),
    /// Fetch of one run.
    Get(BackupRunId),
    /// Start of an on-demand backup.
    Insert,
    /// Deletion of one run.
    Delete(BackupRunId),
}

type InstanceKey = (String, String);

/// In-memory backup admin service for local runs and tests.
///
/// Runs are kept newest first per instance and every call is recorded.
#[derive(Debug)]
pub struct InMemoryBackupAdmin {
    runs: RwLock<HashMap<InstanceKey, Vec<BackupRun>>>,
    calls: RwLock<Vec<BackupAdminCall>>,
    next_id: AtomicU64,
}

impl Default for InMemoryBackupAdmin {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackupAdmin {
    /// Creates an admin service with no backup runs.
    #[must_use]
    pub fn new() -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
            calls: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Replaces the runs of an instance. `runs` must be ordered newest first.
    pub async fn seed(&self, instance: &InstanceRef, runs: Vec<BackupRun>) {
        self.runs.write().await.insert(key(instance), runs);
    }

    /// Returns the current runs of an instance, newest first.
    pub async fn runs(&self, instance: &InstanceRef) -> Vec<BackupRun> {
        self.runs
            .read()
            .await
            .get(&key(instance))
            .cloned()
            .unwrap_or_default()
    }

    /// Returns every call received so far.
    pub async fn calls(&self) -> Vec<BackupAdminCall> {
        self.calls.read().await.clone()
    }

    async fn record(&self, call: BackupAdminCall) {
        self.calls.write().await.push(call);
    }
}

fn key(instance: &InstanceRef) -> InstanceKey {
    (
        instance.project_id().to_owned(),
        instance.instance_id().to_owned(),
    )
}

fn run_not_found() -> AppError {
    AppError::Upstream {
        status: 404,
        message: "The backup run does not exist.".to_owned(),
    }
}

fn operation(instance: &InstanceRef, operation_type: &str) -> Value {
    json!({
        "kind": "sql#operation",
        "operationType": operation_type,
        "status": "DONE",
        "targetProject": instance.project_id(),
        "targetId": instance.instance_id(),
        "insertTime": Utc::now().to_rfc3339(),
    })
}

#[async_trait]
impl BackupAdminRepository for InMemoryBackupAdmin {
    async fn list_backup_runs(
        &self,
        instance: &InstanceRef,
        query: BackupRunPageQuery,
    ) -> AppResult<BackupRunPage> {
        self.record(BackupAdminCall::List(query.clone())).await;

        let offset = match query.page_token.as_deref() {
            Some(token) => token.parse::<usize>().map_err(|_| AppError::Upstream {
                status: 400,
                message: format!("Invalid page token '{token}'."),
            })?,
            None => 0,
        };
        let page_size = usize::try_from(query.max_results.max(1)).unwrap_or(usize::MAX);

        let runs = self.runs.read().await;
        let all = runs.get(&key(instance)).map(Vec::as_slice).unwrap_or_default();
        let items: Vec<BackupRun> = all.iter().skip(offset).take(page_size).cloned().collect();
        let next_offset = offset.saturating_add(items.len());
        let next_page_token = (next_offset < all.len()).then(|| next_offset.to_string());

        Ok(BackupRunPage {
            items,
            next_page_token,
        })
    }

    async fn get_backup_run(
        &self,
        instance: &InstanceRef,
        backup_run_id: &BackupRunId,
    ) -> AppResult<AdminResponse<Value>> {
        self.record(BackupAdminCall::Get(backup_run_id.clone()))
            .await;

        let runs = self.runs.read().await;
        let run = runs
            .get(&key(instance))
            .and_then(|runs| runs.iter().find(|run| run.id() == backup_run_id))
            .ok_or_else(run_not_found)?;

        let mut record = serde_json::to_value(BackupRunWire::from_domain(run))
            .map_err(|error| AppError::Internal(format!("failed to encode backup run: {error}")))?;
        if let Some(fields) = record.as_object_mut() {
            fields.insert("kind".to_owned(), json!("sql#backupRun"));
            fields.insert("instance".to_owned(), json!(instance.instance_id()));
        }

        Ok(AdminResponse::new(200, record))
    }

    async fn insert_backup_run(&self, instance: &InstanceRef) -> AppResult<AdminResponse<Value>> {
        self.record(BackupAdminCall::Insert).await;

        let sequence = self.next_id.fetch_add(1, Ordering::Relaxed);
        let id = BackupRunId::new(format!(
            "{}{sequence:03}",
            Utc::now().timestamp_millis()
        ))?;
        let run = BackupRun::new(
            id,
            BackupRunType::OnDemand,
            Some("SUCCESSFUL".to_owned()),
            Some(Utc::now()),
        );

        self.runs
            .write()
            .await
            .entry(key(instance))
            .or_default()
            .insert(0, run);

        Ok(AdminResponse::new(200, operation(instance, "BACKUP_VOLUME")))
    }

    async fn delete_backup_run(
        &self,
        instance: &InstanceRef,
        backup_run_id: &BackupRunId,
    ) -> AppResult<AdminResponse<Value>> {
        self.record(BackupAdminCall::Delete(backup_run_id.clone()))
            .await;

        let mut runs = self.runs.write().await;
        let instance_runs = runs.get_mut(&key(instance)).ok_or_else(run_not_found)?;
        let position = instance_runs
            .iter()
            .position(|run| run.id() == backup_run_id)
            .ok_or_else(run_not_found)?;
        instance_runs.remove(position);

        Ok(AdminResponse::new(200, operation(instance, "DELETE_BACKUP")))
    }
}
