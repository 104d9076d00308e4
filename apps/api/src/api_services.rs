use std::sync::Arc;

use backupgate_application::{AccessTokenProvider, BackupAdminRepository, BackupService};
use backupgate_core::{AppError, AppResult};
use backupgate_infrastructure::{
    CloudSqlBackupAdminClient, InMemoryBackupAdmin, MetadataServerTokenProvider,
    StaticTokenProvider,
};
use tracing::info;

use crate::api_config::{ApiConfig, BackupAdminProviderConfig, TokenSourceConfig};
use crate::state::AppState;

pub fn build_app_state(config: &ApiConfig) -> AppResult<AppState> {
    let admin: Arc<dyn BackupAdminRepository> = match &config.backup_admin {
        BackupAdminProviderConfig::CloudSql {
            base_url,
            timeout,
            token_source,
        } => {
            let http_client = reqwest::Client::builder()
                .timeout(*timeout)
                .build()
                .map_err(|error| {
                    AppError::Internal(format!("failed to build HTTP client: {error}"))
                })?;

            let token_provider: Arc<dyn AccessTokenProvider> = match token_source {
                TokenSourceConfig::MetadataServer { base_url } => Arc::new(
                    MetadataServerTokenProvider::new(http_client.clone(), base_url)?,
                ),
                TokenSourceConfig::Static { token } => {
                    Arc::new(StaticTokenProvider::new(token.clone())?)
                }
            };

            info!(base_url = %base_url, "using Cloud SQL admin backend");
            Arc::new(CloudSqlBackupAdminClient::new(
                http_client,
                base_url,
                token_provider,
            )?)
        }
        BackupAdminProviderConfig::InMemory => {
            info!("using in-memory backup admin backend");
            Arc::new(InMemoryBackupAdmin::new())
        }
    };

    Ok(AppState {
        backup_service: BackupService::new(admin, config.list_page_size),
    })
}
