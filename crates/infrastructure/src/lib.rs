//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod cloudsql_backup_admin_client;
mod cloudsql_wire;
mod in_memory_backup_admin;
mod metadata_server_token_provider;
mod static_token_provider;

pub use cloudsql_backup_admin_client::{CLOUDSQL_ADMIN_BASE_URL, CloudSqlBackupAdminClient};
pub use in_memory_backup_admin::{BackupAdminCall, InMemoryBackupAdmin};
pub use metadata_server_token_provider::{
    CLOUD_SQL_ADMIN_SCOPES, GOOGLE_METADATA_BASE_URL, MetadataServerTokenProvider,
};
pub use static_token_provider::StaticTokenProvider;
