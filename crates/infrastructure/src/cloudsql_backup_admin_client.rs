use std::sync::Arc;

use async_trait::async_trait;
use backupgate_application::{
    AccessTokenProvider, AdminResponse, BackupAdminRepository, BackupRunPage, BackupRunPageQuery,
};
use backupgate_core::{AppError, AppResult};
use backupgate_domain::{BackupRunId, InstanceRef};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::cloudsql_wire::{BackupRunListWire, upstream_error};

/// Public endpoint of the Cloud SQL Admin API used for backup runs.
pub const CLOUDSQL_ADMIN_BASE_URL: &str = "https://sqladmin.googleapis.com/sql/v1beta4";

/// Backup admin adapter backed by the Cloud SQL Admin REST API.
pub struct CloudSqlBackupAdminClient {
    http_client: reqwest::Client,
    base_url: Url,
    token_provider: Arc<dyn AccessTokenProvider>,
}

impl CloudSqlBackupAdminClient {
    /// Creates a client rooted at `base_url`, e.g. [`CLOUDSQL_ADMIN_BASE_URL`].
    pub fn new(
        http_client: reqwest::Client,
        base_url: &str,
        token_provider: Arc<dyn AccessTokenProvider>,
    ) -> AppResult<Self> {
        let base_url = Url::parse(base_url).map_err(|error| {
            AppError::Validation(format!("invalid Cloud SQL admin base URL '{base_url}': {error}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Validation(format!(
                "Cloud SQL admin base URL '{base_url}' cannot carry a path"
            )));
        }

        Ok(Self {
            http_client,
            base_url,
            token_provider,
        })
    }

    fn backup_runs_url(
        &self,
        instance: &InstanceRef,
        backup_run_id: Option<&BackupRunId>,
    ) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                AppError::Internal("Cloud SQL admin base URL cannot carry a path".to_owned())
            })?;
            segments.pop_if_empty().extend([
                "projects",
                instance.project_id(),
                "instances",
                instance.instance_id(),
                "backupRuns",
            ]);
            if let Some(backup_run_id) = backup_run_id {
                segments.push(backup_run_id.as_str());
            }
        }

        Ok(url)
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> AppResult<AdminResponse<Value>> {
        let token = self.token_provider.access_token().await?;
        let response = request
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        debug!(status = status.as_u16(), "Cloud SQL admin responded");

        if !status.is_success() {
            return Err(upstream_error(status, body.as_str()));
        }

        let payload = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(body.as_str()).map_err(|error| AppError::Upstream {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                message: format!("Cloud SQL admin returned an unreadable body: {error}"),
            })?
        };

        Ok(AdminResponse::new(status.as_u16(), payload))
    }
}

fn transport_error(error: reqwest::Error) -> AppError {
    AppError::Upstream {
        status: StatusCode::BAD_GATEWAY.as_u16(),
        message: format!("Cloud SQL admin request failed: {error}"),
    }
}

#[async_trait]
impl BackupAdminRepository for CloudSqlBackupAdminClient {
    async fn list_backup_runs(
        &self,
        instance: &InstanceRef,
        query: BackupRunPageQuery,
    ) -> AppResult<BackupRunPage> {
        let mut url = self.backup_runs_url(instance, None)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("maxResults", query.max_results.to_string().as_str());
            if let Some(page_token) = query.page_token.as_deref() {
                pairs.append_pair("pageToken", page_token);
            }
        }

        let response = self.execute(self.http_client.get(url)).await?;
        let listing: BackupRunListWire = if response.body.is_null() {
            BackupRunListWire::default()
        } else {
            serde_json::from_value(response.body).map_err(|error| AppError::Upstream {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                message: format!("Cloud SQL admin returned an unexpected backup run listing: {error}"),
            })?
        };

        let items = listing
            .items
            .into_iter()
            .map(|item| item.into_domain())
            .collect::<AppResult<Vec<_>>>()?;

        Ok(BackupRunPage {
            items,
            next_page_token: listing.next_page_token,
        })
    }

    async fn get_backup_run(
        &self,
        instance: &InstanceRef,
        backup_run_id: &BackupRunId,
    ) -> AppResult<AdminResponse<Value>> {
        let url = self.backup_runs_url(instance, Some(backup_run_id))?;
        self.execute(self.http_client.get(url)).await
    }

    async fn insert_backup_run(&self, instance: &InstanceRef) -> AppResult<AdminResponse<Value>> {
        let url = self.backup_runs_url(instance, None)?;
        self.execute(self.http_client.post(url).json(&serde_json::json!({})))
            .await
    }

    async fn delete_backup_run(
        &self,
        instance: &InstanceRef,
        backup_run_id: &BackupRunId,
    ) -> AppResult<AdminResponse<Value>> {
        let url = self.backup_runs_url(instance, Some(backup_run_id))?;
        self.execute(self.http_client.delete(url)).await
    }
}
