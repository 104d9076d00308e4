//! Application services and ports.

#![forbid(unsafe_code)]

mod backup_ports;
mod backup_service;

pub use backup_ports::{
    AccessTokenProvider, AdminResponse, BackupAdminRepository, BackupRunPage, BackupRunPageQuery,
};
pub use backup_service::{BackupService, BackupStatusLookup, DEFAULT_LIST_PAGE_SIZE};
