use backupgate_application::BackupService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub backup_service: BackupService,
}
